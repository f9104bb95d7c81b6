// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Work-queue executor: dependency counting with a priority queue of ready
//! tasks.
//!
//! # Execution Flow
//!
//! 1. **Initialization**: count unfinished dependencies per task and compute
//!    each task's height (longest chain of dependents)
//! 2. **Queue Setup**: every task with no dependencies goes into the
//!    [`PriorityWorkQueue`]
//! 3. **Execution Loop**: start ready tasks up to `max_concurrency`; when a
//!    task completes, decrement its dependents' counters and queue the ones
//!    that reach zero
//! 4. **Result Collection**: every task gets a [`TaskRecord`]; tasks that
//!    never started are marked `Skipped` or `Cancelled`
//!
//! A task starts as soon as its own dependencies are done, independent of
//! unrelated work elsewhere in the graph. Dependents of a failed task never
//! reach a zero count, so under `ContinueOnError` independent branches keep
//! running while the failed subtree is skipped. Under `FailFast` no new task
//! starts after the first failure; in-flight tasks are allowed to finish.
//!
//! Cancellation is checked before each task starts.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::engine::priority_work_queue::{PrioritizedTask, PriorityWorkQueue};
use crate::engine::run_result::TaskRecord;
use crate::engine::task_runner::TaskRunner;
use crate::engine::tracker::ExecutionTracker;
use crate::errors::{ExecutionError, FailureStrategy};
use crate::observability::messages::engine::{
    ExecutionCompleted, ExecutionStarted, RunCancelled, SchedulingHalted,
};
use crate::observability::messages::StructuredLog;
use crate::traits::executor::DagExecutor;

pub struct WorkQueueExecutor {
    /// Maximum number of tasks running at once
    max_concurrency: usize,
}

impl WorkQueueExecutor {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1), // Ensure at least 1
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }
}

impl Default for WorkQueueExecutor {
    /// One worker per available CPU.
    fn default() -> Self {
        let concurrency = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::new(concurrency)
    }
}

#[async_trait]
impl DagExecutor for WorkQueueExecutor {
    fn name(&self) -> &'static str {
        "work_queue"
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

        // === PHASE 1: DEPENDENCY COUNTS AND PRIORITIES ===
        let mut remaining: Vec<usize> = graph.nodes().iter().map(|node| node.dependencies.len()).collect();
        let heights = graph.heights();

        // === PHASE 2: WORK QUEUE INITIALIZATION ===
        let mut queue = PriorityWorkQueue::new();
        queue.extend(
            graph
                .roots()
                .into_iter()
                .map(|id| PrioritizedTask::new(id, heights[id])),
        );

        // === PHASE 3: EXECUTION STATE ===
        let mut tracker = ExecutionTracker::new(graph.len());
        let mut running = JoinSet::new();
        let mut halted = false;
        let mut cancelled = false;

        // === PHASE 4: MAIN EXECUTION LOOP ===
        loop {
            // === START READY TASKS ===
            while !halted && running.len() < self.max_concurrency {
                if cancel.is_cancelled() {
                    cancelled = true;
                    halted = true;
                    break;
                }
                let Some(id) = queue.pop() else {
                    break;
                };
                let runner = runner.clone();
                running.spawn(async move { runner.run(id).await });
            }

            // === WAIT FOR PROGRESS ===
            // Empty once nothing is running and nothing more can start.
            let Some(joined) = running.join_next().await else {
                break;
            };
            let outcome = joined.map_err(|e| ExecutionError::Internal {
                message: format!("Task join error: {}", e),
            })?;

            // === DEPENDENCY RESOLUTION ===
            match &outcome.result {
                Ok(_) => {
                    for &dependent in &graph.node(outcome.task).dependents {
                        remaining[dependent] -= 1;
                        if remaining[dependent] == 0 {
                            queue.push(PrioritizedTask::new(dependent, heights[dependent]));
                        }
                    }
                }
                Err(_) if failure_strategy == FailureStrategy::FailFast && !halted => {
                    halted = true;
                    SchedulingHalted {
                        failed_task: &graph.node(outcome.task).label(),
                        in_flight: running.len(),
                    }
                    .log();
                }
                // Dependents keep a non-zero count and are never queued.
                Err(_) => {}
            }
            tracker.record(&graph, outcome);
        }

        // === PHASE 5: RESULT COLLECTION ===
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
