// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::corpus::{AnnotationLayer, Span};
use crate::errors::AnnotatorError;
use crate::registry::{AnnotatorSpec, ParamSpec};
use crate::traits::{Annotator, AnnotatorInput, LayerSet};

/// Renders tagged tokens as a single `word/TAG word/TAG ...` line.
///
/// The `output` layer holds one annotation spanning the whole document with
/// the rendered line in its `content` attribute.
pub struct Exporter {
    spec: AnnotatorSpec,
}

impl Exporter {
    pub fn new() -> Self {
        Self {
            spec: AnnotatorSpec::new("export", "1.0")
                .describe("Tagged-token rendering of the document")
                .input("tokens")
                .input("pos")
                .output("output")
                .param("delimiter", ParamSpec::string("/")),
        }
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Annotator for Exporter {
    fn spec(&self) -> &AnnotatorSpec {
        &self.spec
    }

    fn annotate(&self, input: AnnotatorInput) -> Result<LayerSet, AnnotatorError> {
        let delimiter = input.str_param("delimiter")?;
        let tokens = input.layer("tokens")?;
        let pos = input.layer("pos")?;

        if tokens.len() != pos.len() {
            return Err(AnnotatorError::failed(format!(
                "'pos' has {} annotations but 'tokens' has {}",
                pos.len(),
                tokens.len()
            )));
        }

        let mut rendered = Vec::with_capacity(tokens.len());
        for (token, tag) in tokens.iter().zip(pos.iter()) {
            if token.span != tag.span {
                return Err(AnnotatorError::failed(format!(
                    "'pos' span {:?} does not match token span {:?}",
                    tag.span, token.span
                )));
            }
            let word = token.span.slice(&input.text).unwrap_or_default();
            let tag = tag.attributes.get("pos").map(String::as_str).unwrap_or_default();
            rendered.push(format!("{}{}{}", word, delimiter, tag));
        }

        let mut output = AnnotationLayer::new("output");
        output.push_attr(Span::new(0, input.text.len()), "content", rendered.join(" "));
        Ok(LayerSet::from([("output".to_string(), output)]))
    }
}
