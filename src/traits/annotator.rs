// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The producer contract every annotator satisfies.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::corpus::AnnotationLayer;
use crate::errors::AnnotatorError;
use crate::registry::{AnnotatorSpec, ParamValue};

/// Output of one annotator invocation: layer name -> layer.
pub type LayerSet = BTreeMap<String, AnnotationLayer>;

/// Everything an annotator receives for one task.
#[derive(Debug, Clone)]
pub struct AnnotatorInput {
    pub document_id: String,
    pub text: Arc<str>,
    /// Committed input layers keyed by annotation name.
    pub layers: BTreeMap<String, Arc<AnnotationLayer>>,
    /// Resolved raw file inputs keyed by their declared relative path.
    pub files: BTreeMap<String, PathBuf>,
    /// Fully resolved parameter values (defaults applied).
    pub parameters: BTreeMap<String, ParamValue>,
}

impl AnnotatorInput {
    pub fn layer(&self, name: &str) -> Result<&AnnotationLayer, AnnotatorError> {
        self.layers
            .get(name)
            .map(Arc::as_ref)
            .ok_or_else(|| AnnotatorError::MissingInput(name.to_string()))
    }

    pub fn file(&self, declared: &str) -> Result<&Path, AnnotatorError> {
        self.files
            .get(declared)
            .map(PathBuf::as_path)
            .ok_or_else(|| AnnotatorError::MissingInput(format!("file:{}", declared)))
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.parameters.get(name)
    }

    pub fn str_param(&self, name: &str) -> Result<&str, AnnotatorError> {
        self.param(name)
            .and_then(ParamValue::as_str)
            .ok_or_else(|| missing_param(name, "string"))
    }

    pub fn int_param(&self, name: &str) -> Result<i64, AnnotatorError> {
        self.param(name)
            .and_then(ParamValue::as_int)
            .ok_or_else(|| missing_param(name, "integer"))
    }

    pub fn bool_param(&self, name: &str) -> Result<bool, AnnotatorError> {
        self.param(name)
            .and_then(ParamValue::as_bool)
            .ok_or_else(|| missing_param(name, "boolean"))
    }
}

fn missing_param(name: &str, kind: &str) -> AnnotatorError {
    AnnotatorError::InvalidParameter {
        name: name.to_string(),
        reason: format!("expected a {} value", kind),
    }
}

/// A registered producer of annotation layers.
///
/// `annotate` is treated as a blocking call: the executor runs it on a
/// dedicated blocking thread and commits its output only after validating it
/// against the declared outputs.
pub trait Annotator: Send + Sync {
    fn spec(&self) -> &AnnotatorSpec;

    fn annotate(&self, input: AnnotatorInput) -> Result<LayerSet, AnnotatorError>;

    fn name(&self) -> &str {
        &self.spec().name
    }
}

/// Adapts a closure into an [`Annotator`].
///
/// ```
/// use annograph::corpus::{AnnotationLayer, Span};
/// use annograph::registry::AnnotatorSpec;
/// use annograph::traits::{Annotator, FnAnnotator, LayerSet};
///
/// let whole = FnAnnotator::new(
///     AnnotatorSpec::new("whole_text", "1").output("text_span"),
///     |input| {
///         let mut layer = AnnotationLayer::new("text_span");
///         layer.push_attr(Span::new(0, input.text.len()), "kind", "document");
///         Ok(LayerSet::from([("text_span".to_string(), layer)]))
///     },
/// );
/// assert_eq!(whole.name(), "whole_text");
/// ```
pub struct FnAnnotator<F> {
    spec: AnnotatorSpec,
    func: F,
}

impl<F> FnAnnotator<F>
where
    F: Fn(AnnotatorInput) -> Result<LayerSet, AnnotatorError> + Send + Sync,
{
    pub fn new(spec: AnnotatorSpec, func: F) -> Self {
        Self { spec, func }
    }
}

impl<F> Annotator for FnAnnotator<F>
where
    F: Fn(AnnotatorInput) -> Result<LayerSet, AnnotatorError> + Send + Sync,
{
    fn spec(&self) -> &AnnotatorSpec {
        &self.spec
    }

    fn annotate(&self, input: AnnotatorInput) -> Result<LayerSet, AnnotatorError> {
        (self.func)(input)
    }
}

impl<F> fmt::Debug for FnAnnotator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAnnotator").field("spec", &self.spec).finish()
    }
}
