// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::cache::CacheStore;
use crate::config::{CacheBackendKind, EngineConfig, RequestConfig};
use crate::corpus::Corpus;
use crate::engine::{Engine, ExecutorFactory};
use crate::graph::RunRequest;
use crate::registry::AnnotatorRegistry;

/// Engine runtime builder - wires the cache store, executor and producer
/// selection described by a configuration around a registry.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use annograph::config::{EngineConfig, RuntimeBuilder, Strategy};
/// use annograph::registry::AnnotatorRegistry;
///
/// let config: EngineConfig = serde_yaml::from_str(
///     "strategy: level\ncache:\n  backend: memory\nrequest:\n  outputs: [pos]\n",
/// ).unwrap();
/// let registry = Arc::new(AnnotatorRegistry::with_builtin_annotators().unwrap());
///
/// let engine = RuntimeBuilder::from_config(&config, registry);
/// assert_eq!(engine.executor_name(), "level");
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Build an [`Engine`] from configuration.
    pub fn from_config(cfg: &EngineConfig, registry: Arc<AnnotatorRegistry>) -> Engine {
        Engine::new(registry, Arc::new(Self::cache_store(cfg)))
            .with_executor(ExecutorFactory::from_config(cfg))
            .with_selection(cfg.producer_selection())
            .with_failure_strategy(cfg.failure_strategy)
    }

    pub fn cache_store(cfg: &EngineConfig) -> CacheStore {
        match cfg.cache.backend {
            CacheBackendKind::Filesystem => CacheStore::filesystem(&cfg.cache.directory),
            CacheBackendKind::Memory => CacheStore::in_memory(),
        }
    }

    /// Turn the configured request section into a [`RunRequest`] over `corpus`.
    pub fn run_request(request: &RequestConfig, corpus: Arc<Corpus>) -> RunRequest {
        RunRequest {
            outputs: request.outputs.clone(),
            corpus,
            parameters: request.parameters.clone(),
            document_parameters: request.document_parameters.clone(),
        }
    }
}
