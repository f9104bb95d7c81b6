// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error taxonomy for the annotation engine.
//!
//! Each subsystem owns one error enum. Resolution-time errors (registry,
//! resolution, config) abort a run before any task executes; execution-time
//! errors are tagged with the originating task's identity. [`EngineError`]
//! unifies them for callers that drive a whole run.
//!
//! Every error exposes a `kind()` naming its taxonomy class, e.g.
//! `CyclicDependencyError` or `AnnotatorExecutionError`. The binary prints that
//! kind next to the error context.

mod annotator;
mod cache;
mod config;
mod corpus;
mod execution;
mod registry;
mod resolution;

pub use annotator::AnnotatorError;
pub use cache::CacheError;
pub use config::ConfigError;
pub use corpus::CorpusError;
pub use execution::{ExecutionError, FailureStrategy, TaskContext};
pub use registry::RegistryError;
pub use resolution::ResolutionError;

use thiserror::Error;

/// Top-level error for driving a complete run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("{}", render_resolution_errors(.0))]
    Resolution(Vec<ResolutionError>),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl EngineError {
    /// Taxonomy kind of this error. For a batch of resolution errors this is
    /// the kind of the first one.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Registry(e) => e.kind(),
            EngineError::Resolution(errors) => errors
                .first()
                .map(ResolutionError::kind)
                .unwrap_or("ResolutionError"),
            EngineError::Execution(e) => e.kind(),
            EngineError::Config(e) => e.kind(),
            EngineError::Corpus(_) => "CorpusError",
            EngineError::Cache(e) => e.kind(),
        }
    }
}

impl From<Vec<ResolutionError>> for EngineError {
    fn from(errors: Vec<ResolutionError>) -> Self {
        EngineError::Resolution(errors)
    }
}

impl From<ResolutionError> for EngineError {
    fn from(error: ResolutionError) -> Self {
        EngineError::Resolution(vec![error])
    }
}

fn render_resolution_errors(errors: &[ResolutionError]) -> String {
    match errors {
        [] => "Resolution failed".to_string(),
        [single] => single.to_string(),
        many => {
            let lines: Vec<String> = many.iter().map(|e| format!("  - {}", e)).collect();
            format!("Resolution failed with {} errors:\n{}", many.len(), lines.join("\n"))
        }
    }
}
