// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use thiserror::Error;

/// Errors loading a corpus or committing layers into it.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Failed to read corpus path '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corpus location '{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("Failed to parse source layers '{}': {source}", .path.display())]
    SourceLayers {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Duplicate document id '{0}'")]
    DuplicateDocument(String),

    #[error("Layer '{layer}' on document '{document_id}' is invalid: {reason}")]
    InvalidLayer {
        document_id: String,
        layer: String,
        reason: String,
    },
}
