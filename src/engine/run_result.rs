// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheStatsSnapshot;
use crate::corpus::{AnnotationLayer, Corpus};
use crate::errors::{EngineError, ExecutionError, FailureStrategy};
use crate::graph::{DependencyGraph, TaskId, TaskNode};

/// Final state of a task, or of a requested output on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    /// Output committed. `cache_hit` is true when no producer ran for it.
    Completed { cache_hit: bool },
    Failed,
    /// Not run because a dependency failed or was skipped.
    Skipped,
    /// Not run because the run was cancelled or stopped after a failure.
    Cancelled,
}

impl TaskStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed { .. })
    }

    /// Failed, or downstream of a failure.
    pub fn blocks_dependents(&self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::Skipped)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskStatus::Completed { cache_hit: true } => "completed (cached)",
            TaskStatus::Completed { cache_hit: false } => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
            TaskStatus::Cancelled => "cancelled",
        })
    }
}

/// What happened to one task.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub task: TaskId,
    pub annotator: String,
    pub document_id: String,
    pub status: TaskStatus,
    pub error: Option<ExecutionError>,
    pub duration: Duration,
    /// Position in completion order, for tasks that ran.
    pub sequence: Option<usize>,
}

impl TaskRecord {
    pub(crate) fn not_run(node: &TaskNode, status: TaskStatus) -> Self {
        Self {
            task: node.id,
            annotator: node.annotator_name().to_string(),
            document_id: node.document_id().to_string(),
            status,
            error: None,
            duration: Duration::ZERO,
            sequence: None,
        }
    }
}

/// Outcome of a whole run.
///
/// Task failures do not make [`Engine::run`](crate::engine::Engine::run)
/// return an error; they are recorded here. Use [`RunResult::into_result`] to
/// turn them into an [`EngineError`] according to the failure strategy.
#[derive(Debug)]
pub struct RunResult {
    records: Vec<TaskRecord>,
    outputs: BTreeMap<String, BTreeMap<String, TaskStatus>>,
    errors: Vec<ExecutionError>,
    cache: CacheStatsSnapshot,
    failure_strategy: FailureStrategy,
    corpus: Arc<Corpus>,
}

impl RunResult {
    pub(crate) fn new(
        graph: &DependencyGraph,
        records: Vec<TaskRecord>,
        cache: CacheStatsSnapshot,
        failure_strategy: FailureStrategy,
    ) -> Self {
        let by_task: BTreeMap<TaskId, TaskStatus> = records.iter().map(|r| (r.task, r.status)).collect();

        let mut outputs = BTreeMap::new();
        for document in graph.corpus().documents() {
            let statuses = graph
                .requested_outputs()
                .iter()
                .map(|output| {
                    let status = match graph.producer_of(document.id(), output) {
                        Some(task) => by_task.get(&task).copied().unwrap_or(TaskStatus::Cancelled),
                        // Already present on the document before the run.
                        None => TaskStatus::Completed { cache_hit: true },
                    };
                    (output.clone(), status)
                })
                .collect();
            outputs.insert(document.id().to_string(), statuses);
        }

        let mut failed: Vec<&TaskRecord> = records.iter().filter(|r| r.error.is_some()).collect();
        failed.sort_by_key(|r| r.sequence);
        let errors = failed.into_iter().filter_map(|r| r.error.clone()).collect();

        Self {
            records,
            outputs,
            errors,
            cache,
            failure_strategy,
            corpus: Arc::clone(graph.corpus()),
        }
    }

    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }

    /// document id -> requested output -> status
    pub fn outputs(&self) -> &BTreeMap<String, BTreeMap<String, TaskStatus>> {
        &self.outputs
    }

    pub fn status(&self, document_id: &str, output: &str) -> Option<TaskStatus> {
        self.outputs.get(document_id)?.get(output).copied()
    }

    /// Execution errors in the order they occurred.
    pub fn errors(&self) -> &[ExecutionError] {
        &self.errors
    }

    /// Cache counters accumulated during this run.
    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache
    }

    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }

    pub fn layer(&self, document_id: &str, name: &str) -> Option<Arc<AnnotationLayer>> {
        self.corpus.document(document_id)?.layer(name)
    }

    /// Number of producer invocations that ran to completion.
    pub fn invocations(&self) -> usize {
        self.count(TaskStatus::Completed { cache_hit: false })
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    pub fn was_cancelled(&self) -> bool {
        self.records.iter().any(|r| r.status == TaskStatus::Cancelled) && self.errors.is_empty()
    }

    pub fn is_success(&self) -> bool {
        self.records.iter().all(|r| r.status.is_completed())
    }

    /// The run's error under its failure strategy: the first error for
    /// fail-fast, every error for continue-on-error.
    pub fn error(&self) -> Option<ExecutionError> {
        match (self.failure_strategy, self.errors.as_slice()) {
            (_, []) => None,
            (FailureStrategy::FailFast, [first, ..]) | (FailureStrategy::ContinueOnError, [first]) => {
                Some(first.clone())
            }
            (FailureStrategy::ContinueOnError, all) => Some(ExecutionError::MultipleFailed {
                failures: all.to_vec(),
            }),
        }
    }

    pub fn into_result(self) -> Result<Self, EngineError> {
        match self.error() {
            Some(error) => Err(EngineError::Execution(error)),
            None => Ok(self),
        }
    }
}
