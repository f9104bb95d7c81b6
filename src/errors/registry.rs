// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors raised while populating the annotator registry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    /// Another annotator already produces this output and the new one was not
    /// registered as an override.
    #[error(
        "Output '{output}' is already produced by '{existing}'; register '{candidate}' as an override to add an alternative producer"
    )]
    DuplicateProducer {
        output: String,
        existing: String,
        candidate: String,
    },

    #[error("Annotator '{name}' is already registered")]
    DuplicateAnnotator { name: String },

    #[error("Annotator '{name}' declares no outputs")]
    NoOutputs { name: String },

    #[error("Annotator '{name}' parameter '{parameter}': {reason}")]
    InvalidParameterSchema {
        name: String,
        parameter: String,
        reason: String,
    },
}

impl RegistryError {
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryError::DuplicateProducer { .. } => "DuplicateProducerError",
            RegistryError::DuplicateAnnotator { .. } => "DuplicateProducerError",
            RegistryError::NoOutputs { .. } | RegistryError::InvalidParameterSchema { .. } => {
                "ConfigValidationError"
            }
        }
    }
}
