// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use thiserror::Error;

/// Errors detected while resolving requested outputs into a task graph.
///
/// All of these are reported before any task runs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolutionError {
    /// More than one producer is registered for an output and neither a
    /// configured preference nor the tie-break policy selects one.
    #[error("Output '{output}' is ambiguous: candidates {}", .candidates.join(", "))]
    AmbiguousProducer {
        output: String,
        candidates: Vec<String>,
    },

    /// A required, non-raw input has no registered producer.
    #[error("No producer for '{input}'{}", required_by_suffix(.required_by))]
    MissingProducer {
        input: String,
        required_by: Option<String>,
    },

    /// The producer graph contains a cycle. The path repeats its first member
    /// at the end.
    #[error("Cyclic dependency detected: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// A parameter value violates the annotator's schema.
    #[error("Invalid parameter '{annotator}.{parameter}'{}: {reason}", document_suffix(.document_id))]
    ConfigValidation {
        annotator: String,
        parameter: String,
        document_id: Option<String>,
        reason: String,
    },

    /// A configured producer preference does not name a producer of that output.
    #[error("Preference for '{output}' names '{annotator}', which does not produce it")]
    InvalidPreference { output: String, annotator: String },

    #[error("Annotator '{annotator}' requires input file '{}' which does not exist", .path.display())]
    MissingInputFile { annotator: String, path: PathBuf },

    #[error("Internal resolution error: {message}")]
    Internal { message: String },
}

impl ResolutionError {
    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionError::AmbiguousProducer { .. } => "AmbiguousProducerError",
            ResolutionError::MissingProducer { .. } => "MissingProducerError",
            ResolutionError::CyclicDependency { .. } => "CyclicDependencyError",
            ResolutionError::ConfigValidation { .. } | ResolutionError::InvalidPreference { .. } => {
                "ConfigValidationError"
            }
            ResolutionError::MissingInputFile { .. } => "MissingInputError",
            ResolutionError::Internal { .. } => "InternalError",
        }
    }
}

fn required_by_suffix(required_by: &Option<String>) -> String {
    match required_by {
        Some(annotator) => format!(" (required by '{}')", annotator),
        None => " (requested output)".to_string(),
    }
}

fn document_suffix(document_id: &Option<String>) -> String {
    match document_id {
        Some(id) => format!(" for document '{}'", id),
        None => String::new(),
    }
}
