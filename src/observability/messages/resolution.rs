// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for producer selection and plan construction.

use crate::errors::ResolutionError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A producer was chosen for an output among several candidates.
///
/// # Log Level
/// `debug!`
pub struct ProducerSelected<'a> {
    pub output: &'a str,
    pub annotator: &'a str,
    pub candidates: usize,
}

impl Display for ProducerSelected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Selected '{}' to produce '{}' ({} candidates)",
            self.annotator, self.output, self.candidates
        )
    }
}

impl StructuredLog for ProducerSelected<'_> {
    fn log(&self) {
        tracing::debug!(
            output = self.output,
            annotator = self.annotator,
            candidates = self.candidates,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("producer_selected", span_name = name, output = self.output)
    }
}

/// The plan was resolved and expanded into tasks.
///
/// # Log Level
/// `info!`
///
/// # Example
/// ```
/// use annograph::observability::messages::resolution::PlanResolved;
///
/// let msg = PlanResolved {
///     annotators: &["tokenize", "postag"],
///     documents: 2,
///     tasks: 4,
/// };
/// assert_eq!(
///     msg.to_string(),
///     "Resolved plan [tokenize -> postag] over 2 documents: 4 tasks"
/// );
/// ```
pub struct PlanResolved<'a> {
    pub annotators: &'a [&'a str],
    pub documents: usize,
    pub tasks: usize,
}

impl Display for PlanResolved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Resolved plan [{}] over {} documents: {} tasks",
            self.annotators.join(" -> "),
            self.documents,
            self.tasks
        )
    }
}

impl StructuredLog for PlanResolved<'_> {
    fn log(&self) {
        tracing::info!(
            annotators = ?self.annotators,
            documents = self.documents,
            tasks = self.tasks,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("plan", span_name = name, tasks = self.tasks)
    }
}

/// Resolution failed; nothing will execute.
///
/// # Log Level
/// `error!`, one event per error
pub struct ResolutionFailed<'a> {
    pub errors: &'a [ResolutionError],
}

impl Display for ResolutionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Resolution failed with {} errors", self.errors.len())
    }
}

impl StructuredLog for ResolutionFailed<'_> {
    fn log(&self) {
        for error in self.errors {
            tracing::error!(kind = error.kind(), error = %error, "{}", self);
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("resolution_failed", span_name = name, errors = self.errors.len())
    }
}
