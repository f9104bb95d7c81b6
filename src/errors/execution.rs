// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::registry::ParamValue;

/// How the executor reacts when a task fails.
///
/// * `FailFast` - stop scheduling new tasks, let in-flight ones finish and
///   report the first error.
/// * `ContinueOnError` - keep running independent branches; only the
///   dependents of a failed task are skipped. All errors are reported at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStrategy {
    #[default]
    FailFast,
    ContinueOnError,
}

/// Full identity of a task, attached to every execution-time error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskContext {
    pub document_id: String,
    pub annotator: String,
    pub version: String,
    pub parameters: BTreeMap<String, ParamValue>,
}

impl fmt::Display for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "annotator '{}' v{} on document '{}'",
            self.annotator, self.version, self.document_id
        )?;
        if !self.parameters.is_empty() {
            let params: Vec<String> = self
                .parameters
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            write!(f, " with {{{}}}", params.join(", "))?;
        }
        Ok(())
    }
}

/// Errors raised while executing tasks.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutionError {
    /// The annotator returned an error.
    #[error("{context} failed: {message}")]
    AnnotatorFailed { context: TaskContext, message: String },

    /// The annotator returned output that violates its declared contract.
    #[error("{context} returned invalid output: {reason}")]
    InvalidOutput { context: TaskContext, reason: String },

    /// The annotator panicked on its worker thread.
    #[error("{context} panicked: {message}")]
    AnnotatorPanicked { context: TaskContext, message: String },

    /// A committed input layer could not be found when the task started.
    #[error("{context} could not read input '{input}'")]
    InputUnavailable { context: TaskContext, input: String },

    /// The cache store failed in a way that prevented the task from completing.
    #[error("{context} cache failure: {message}")]
    Cache { context: TaskContext, message: String },

    #[error("Internal execution error: {message}")]
    Internal { message: String },

    /// Aggregated failures collected under `ContinueOnError`.
    #[error("{} tasks failed: {}", .failures.len(), render_failures(.failures))]
    MultipleFailed { failures: Vec<ExecutionError> },
}

impl ExecutionError {
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionError::AnnotatorFailed { .. }
            | ExecutionError::InvalidOutput { .. }
            | ExecutionError::AnnotatorPanicked { .. }
            | ExecutionError::InputUnavailable { .. } => "AnnotatorExecutionError",
            ExecutionError::Cache { .. } => "CacheError",
            ExecutionError::Internal { .. } => "InternalError",
            ExecutionError::MultipleFailed { failures } => failures
                .first()
                .map(ExecutionError::kind)
                .unwrap_or("AnnotatorExecutionError"),
        }
    }

    /// The task that raised this error, when it originated from one.
    pub fn context(&self) -> Option<&TaskContext> {
        match self {
            ExecutionError::AnnotatorFailed { context, .. }
            | ExecutionError::InvalidOutput { context, .. }
            | ExecutionError::AnnotatorPanicked { context, .. }
            | ExecutionError::InputUnavailable { context, .. }
            | ExecutionError::Cache { context, .. } => Some(context),
            ExecutionError::Internal { .. } | ExecutionError::MultipleFailed { .. } => None,
        }
    }
}

fn render_failures(failures: &[ExecutionError]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
