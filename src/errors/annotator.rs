// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Typed failure returned by an annotator implementation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnnotatorError {
    #[error("{0}")]
    Failed(String),

    #[error("Missing input layer '{0}'")]
    MissingInput(String),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Failed to read input file '{path}': {reason}")]
    InputFile { path: String, reason: String },
}

impl AnnotatorError {
    pub fn failed(message: impl Into<String>) -> Self {
        AnnotatorError::Failed(message.into())
    }
}
