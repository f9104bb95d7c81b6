// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::engine::run_result::TaskRecord;
use crate::engine::task_runner::{TaskOutcome, TaskRunner};
use crate::engine::tracker::ExecutionTracker;
use crate::errors::{ExecutionError, FailureStrategy};
use crate::graph::TaskId;
use crate::observability::messages::engine::{
    ExecutionCompleted, ExecutionStarted, RunCancelled, SchedulingHalted,
};
use crate::observability::messages::StructuredLog;
use crate::traits::executor::DagExecutor;

/// Level-by-level executor: runs the graph in topological levels.
///
/// Level 0 holds every task without dependencies; level N holds the tasks
/// whose dependencies all sit in levels before N. All tasks of one level run
/// concurrently (bounded by a semaphore) and the next level starts only once
/// the whole level has finished.
///
/// Simpler to reason about than [`WorkQueueExecutor`](crate::engine::WorkQueueExecutor),
/// at the cost of waiting on the slowest task of each level.
///
/// ## Error Handling
/// - A task whose dependency did not complete is not started (`Skipped`)
/// - `FailFast` stops permit holders from starting once a failure is seen,
///   and no later level runs
/// - Cancellation is checked after a task acquires its permit
pub struct LevelByLevelExecutor {
    /// Maximum number of concurrent tasks within a level
    max_concurrency: usize,
}

impl LevelByLevelExecutor {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1), // Ensure at least 1
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Run one level and record the outcome of every task that started.
    async fn execute_level(
        &self,
        level: &[TaskId],
        runner: &TaskRunner,
        halt: &CancellationToken,
        tracker: &mut ExecutionTracker,
        failure_strategy: FailureStrategy,
    ) -> Result<(), ExecutionError> {
        let graph = Arc::clone(runner.graph());
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let max_concurrency = self.max_concurrency;
        let mut tasks = Vec::new();

        for &id in level {
            if !tracker.dependencies_completed(&graph, id) {
                continue;
            }
            let runner = runner.clone();
            let semaphore = Arc::clone(&semaphore);
            let halt = halt.clone();

            let task = tokio::spawn(async move {
                let _permit = Arc::clone(&semaphore).acquire_owned().await.map_err(|e| ExecutionError::Internal {
                    message: format!("Failed to acquire semaphore permit for task {}: {}", id, e),
                })?;
                if halt.is_cancelled() {
                    return Ok::<Option<TaskOutcome>, ExecutionError>(None);
                }
                let outcome = runner.run(id).await;

                // Halt while still holding the permit so no queued task of
                // this level starts after the failure.
                if outcome.result.is_err() && failure_strategy == FailureStrategy::FailFast && !halt.is_cancelled() {
                    halt.cancel();
                    SchedulingHalted {
                        failed_task: &runner.graph().node(id).label(),
                        in_flight: max_concurrency.saturating_sub(semaphore.available_permits() + 1),
                    }
                    .log();
                }
                Ok(Some(outcome))
            });
            tasks.push(task);
        }

        // Wait for every task of the level; outcomes are recorded as they are joined.
        for task in tasks {
            let joined = task.await.map_err(|e| ExecutionError::Internal {
                message: format!("Task join error: {}", e),
            })??;
            if let Some(outcome) = joined {
                tracker.record(&graph, outcome);
            }
        }
        Ok(())
    }
}

impl Default for LevelByLevelExecutor {
    /// One worker per available CPU.
    fn default() -> Self {
        let concurrency = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::new(concurrency)
    }
}

#[async_trait]
impl DagExecutor for LevelByLevelExecutor {
    fn name(&self) -> &'static str {
        "level"
    }

    async fn execute_with_strategy(
        &self,
        runner: TaskRunner,
        cancel: CancellationToken,
        failure_strategy: FailureStrategy,
    ) -> Result<Vec<TaskRecord>, ExecutionError> {
        let graph = Arc::clone(runner.graph());
        let started = Instant::now();
        ExecutionStarted {
            strategy: self.name(),
            task_count: graph.len(),
            max_concurrency: self.max_concurrency,
        }
        .log();

        // Resolution already rejected cycles; a failure here is a bug.
        let levels = graph.levels().map_err(|e| ExecutionError::Internal {
            message: format!("graph is not acyclic: {}", e),
        })?;

        // Cancelled by the caller or by a fail-fast halt.
        let halt = cancel.child_token();
        let mut tracker = ExecutionTracker::new(graph.len());

        for level in &levels {
            if halt.is_cancelled() {
                break;
            }
            self.execute_level(level, &runner, &halt, &mut tracker, failure_strategy)
                .await?;
        }

        let cancelled = cancel.is_cancelled() && tracker.finished() < graph.len();
        if cancelled {
            RunCancelled {
                not_started: graph.len() - tracker.finished(),
            }
            .log();
        }
        ExecutionCompleted {
            strategy: self.name(),
            task_count: graph.len(),
            failed: tracker.failed(),
            cancelled,
            duration: started.elapsed(),
        }
        .log();

        Ok(tracker.into_records(&graph))
    }
}
