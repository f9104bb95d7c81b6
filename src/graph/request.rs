// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::corpus::Corpus;
use crate::registry::ParamValue;

/// Parameter overrides keyed `annotator.parameter`.
pub type ParameterOverrides = BTreeMap<String, ParamValue>;

/// What to compute, over which corpus, with which parameter overrides.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub outputs: Vec<String>,
    pub corpus: Arc<Corpus>,
    /// Global overrides applied to every document.
    pub parameters: ParameterOverrides,
    /// Per-document overrides, applied on top of the global ones.
    pub document_parameters: BTreeMap<String, ParameterOverrides>,
}

impl RunRequest {
    pub fn new<I, S>(corpus: Arc<Corpus>, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            outputs: outputs.into_iter().map(Into::into).collect(),
            corpus,
            parameters: ParameterOverrides::new(),
            document_parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_document_parameter(
        mut self,
        document_id: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Self {
        self.document_parameters
            .entry(document_id.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }
}

/// Split an override key into `(annotator, parameter)`.
pub(crate) fn split_override_key(key: &str) -> Option<(&str, &str)> {
    let (annotator, parameter) = key.split_once('.')?;
    if annotator.is_empty() || parameter.is_empty() {
        return None;
    }
    Some((annotator, parameter))
}
