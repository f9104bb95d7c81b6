// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::corpus::{AnnotationLayer, Span};
use crate::errors::AnnotatorError;
use crate::registry::AnnotatorSpec;
use crate::traits::{Annotator, AnnotatorInput, LayerSet};

/// Splits text into word and punctuation tokens.
///
/// A word is a run of alphanumeric characters, optionally joined by inner
/// apostrophes or hyphens (`don't`, `well-known`). Every other non-space
/// character is a token of its own.
pub struct Tokenizer {
    spec: AnnotatorSpec,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            spec: AnnotatorSpec::new("tokenize", "1.0")
                .describe("Word and punctuation tokens")
                .output("tokens"),
        }
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Annotator for Tokenizer {
    fn spec(&self) -> &AnnotatorSpec {
        &self.spec
    }

    fn annotate(&self, input: AnnotatorInput) -> Result<LayerSet, AnnotatorError> {
        let mut layer = AnnotationLayer::new("tokens");
        for span in token_spans(&input.text) {
            let word = span.slice(&input.text).unwrap_or_default();
            layer.push_attr(span, "word", word);
        }
        Ok(LayerSet::from([("tokens".to_string(), layer)]))
    }
}

/// Byte spans of every token in `text`, in order.
pub fn token_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut word_start: Option<usize> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let joins_word = word_start.is_some()
            && (c == '\'' || c == '-')
            && chars.peek().is_some_and(|&(_, next)| next.is_alphanumeric());
        if c.is_alphanumeric() || joins_word {
            word_start.get_or_insert(i);
            continue;
        }
        if let Some(start) = word_start.take() {
            spans.push(Span::new(start, i));
        }
        if !c.is_whitespace() {
            spans.push(Span::new(i, i + c.len_utf8()));
        }
    }
    if let Some(start) = word_start {
        spans.push(Span::new(start, text.len()));
    }
    spans
}
