// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cache::CacheStore;
use crate::engine::run_result::RunResult;
use crate::engine::task_runner::TaskRunner;
use crate::engine::work_queue::WorkQueueExecutor;
use crate::errors::{EngineError, FailureStrategy};
use crate::graph::{DependencyGraph, GraphBuilder, RunRequest};
use crate::registry::{AnnotatorRegistry, ProducerSelection};
use crate::traits::DagExecutor;

/// Resolves run requests against a registry and executes them with a shared
/// cache.
///
/// The registry and cache store are shared handles; several engines (or
/// several runs of one engine) can use the same cache concurrently.
///
/// ```rust
/// use std::sync::Arc;
/// use annograph::cache::CacheStore;
/// use annograph::corpus::{Corpus, Document};
/// use annograph::engine::Engine;
/// use annograph::graph::RunRequest;
/// use annograph::registry::AnnotatorRegistry;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), annograph::errors::EngineError> {
/// let engine = Engine::new(
///     Arc::new(AnnotatorRegistry::with_builtin_annotators()?),
///     Arc::new(CacheStore::in_memory()),
/// );
/// let corpus = Corpus::from_documents("demo", [Document::new("d1", "The cat sat.")])?;
/// let result = engine
///     .run(RunRequest::new(Arc::new(corpus), ["pos"]))
///     .await?
///     .into_result()?;
///
/// assert_eq!(result.invocations(), 2);
/// assert!(result.layer("d1", "pos").is_some());
/// # Ok(())
/// # }
/// ```
pub struct Engine {
    registry: Arc<AnnotatorRegistry>,
    cache: Arc<CacheStore>,
    executor: Box<dyn DagExecutor>,
    selection: ProducerSelection,
    failure_strategy: FailureStrategy,
    cancel: CancellationToken,
}

impl Engine {
    pub fn new(registry: Arc<AnnotatorRegistry>, cache: Arc<CacheStore>) -> Self {
        Self {
            registry,
            cache,
            executor: Box::new(WorkQueueExecutor::default()),
            selection: ProducerSelection::default(),
            failure_strategy: FailureStrategy::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_executor(mut self, executor: Box<dyn DagExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_selection(mut self, selection: ProducerSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_failure_strategy(mut self, failure_strategy: FailureStrategy) -> Self {
        self.failure_strategy = failure_strategy;
        self
    }

    /// Use an externally owned token, e.g. one shared with a signal handler.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn registry(&self) -> &Arc<AnnotatorRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn executor_name(&self) -> &'static str {
        self.executor.name()
    }

    pub fn failure_strategy(&self) -> FailureStrategy {
        self.failure_strategy
    }

    /// Cancelling this token stops the current run from starting new tasks.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Build the task graph without executing anything.
    pub fn resolve(&self, request: &RunRequest) -> Result<DependencyGraph, EngineError> {
        GraphBuilder::new(&self.registry, &self.selection)
            .build(request)
            .map_err(EngineError::from)
    }

    /// Resolve and execute `request`.
    ///
    /// Resolution errors are returned before any task runs. Task failures are
    /// reported in the [`RunResult`]; see [`RunResult::into_result`].
    pub async fn run(&self, request: RunRequest) -> Result<RunResult, EngineError> {
        // Each run commits into its own copy of the corpus.
        let request = RunRequest {
            corpus: Arc::new(request.corpus.fork()),
            ..request
        };
        let graph = Arc::new(self.resolve(&request)?);
        let before = self.cache.stats();

        let runner = TaskRunner::new(Arc::clone(&graph), Arc::clone(&self.cache));
        let records = self
            .executor
            .execute_with_strategy(runner, self.cancel.clone(), self.failure_strategy)
            .await?;

        Ok(RunResult::new(
            &graph,
            records,
            self.cache.stats().since(&before),
            self.failure_strategy,
        ))
    }
}
