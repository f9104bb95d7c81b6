// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::run_result::{TaskRecord, TaskStatus};
use crate::engine::task_runner::TaskOutcome;
use crate::graph::{DependencyGraph, TaskId};
use crate::observability::messages::engine::{TaskCompleted, TaskFailed, TaskProgress};
use crate::observability::messages::StructuredLog;

/// Per-run bookkeeping shared by the executors: records outcomes as they
/// arrive and assigns a final status to every task that never ran.
pub(crate) struct ExecutionTracker {
    slots: Vec<Option<TaskRecord>>,
    finished: usize,
    failed: usize,
}

impl ExecutionTracker {
    pub fn new(total: usize) -> Self {
        Self {
            slots: vec![None; total],
            finished: 0,
            failed: 0,
        }
    }

    pub fn record(&mut self, graph: &DependencyGraph, outcome: TaskOutcome) {
        let node = graph.node(outcome.task);
        let annotator = node.annotator_name();
        let document_id = node.document_id();
        self.finished += 1;

        let (status, error) = match outcome.result {
            Ok(cache_hit) => {
                TaskCompleted {
                    annotator,
                    document_id,
                    cache_hit,
                    duration: outcome.duration,
                }
                .log();
                (TaskStatus::Completed { cache_hit }, None)
            }
            Err(error) => {
                self.failed += 1;
                TaskFailed {
                    annotator,
                    document_id,
                    error: &error,
                }
                .log();
                (TaskStatus::Failed, Some(error))
            }
        };

        TaskProgress {
            completed: self.finished,
            total: self.slots.len(),
            annotator,
            document_id,
        }
        .log();

        self.slots[outcome.task] = Some(TaskRecord {
            task: outcome.task,
            annotator: annotator.to_string(),
            document_id: document_id.to_string(),
            status,
            error,
            duration: outcome.duration,
            sequence: Some(self.finished),
        });
    }

    pub fn finished(&self) -> usize {
        self.finished
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn dependencies_completed(&self, graph: &DependencyGraph, id: TaskId) -> bool {
        graph.node(id).dependencies.iter().all(|&dep| {
            self.slots[dep]
                .as_ref()
                .is_some_and(|record| record.status.is_completed())
        })
    }

    /// One record per task. Tasks that never ran are `Skipped` when a
    /// dependency failed or was skipped and `Cancelled` otherwise.
    pub fn into_records(self, graph: &DependencyGraph) -> Vec<TaskRecord> {
        let mut records: Vec<TaskRecord> = Vec::with_capacity(self.slots.len());
        // Dependencies always have lower ids than their dependents.
        for (id, slot) in self.slots.into_iter().enumerate() {
            let record = slot.unwrap_or_else(|| {
                let node = graph.node(id);
                let blocked = node
                    .dependencies
                    .iter()
                    .any(|&dep| records[dep].status.blocks_dependents());
                let status = if blocked { TaskStatus::Skipped } else { TaskStatus::Cancelled };
                TaskRecord::not_run(node, status)
            });
            records.push(record);
        }
        records
    }
}
