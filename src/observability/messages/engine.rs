// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for run lifecycle and task execution events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Execution of a resolved task graph started.
///
/// # Log Level
/// `info!`
///
/// # Example
/// ```
/// use annograph::observability::messages::engine::ExecutionStarted;
///
/// let msg = ExecutionStarted {
///     strategy: "work_queue",
///     task_count: 12,
///     max_concurrency: 4,
/// };
///
/// assert!(msg.to_string().contains("12 tasks"));
/// ```
pub struct ExecutionStarted<'a> {
    pub strategy: &'a str,
    pub task_count: usize,
    pub max_concurrency: usize,
}

impl Display for ExecutionStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting annotation run with {} strategy: {} tasks, max_concurrency={}",
            self.strategy, self.task_count, self.max_concurrency
        )
    }
}

impl StructuredLog for ExecutionStarted<'_> {
    fn log(&self) {
        tracing::info!(
            strategy = self.strategy,
            task_count = self.task_count,
            max_concurrency = self.max_concurrency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution",
            span_name = name,
            strategy = self.strategy,
            task_count = self.task_count,
            max_concurrency = self.max_concurrency,
        )
    }
}

/// Execution finished, successfully or not.
///
/// # Log Level
/// `info!`, or `warn!` when tasks failed or the run was cancelled
pub struct ExecutionCompleted<'a> {
    pub strategy: &'a str,
    pub task_count: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub duration: Duration,
}

impl Display for ExecutionCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Annotation run finished with {} strategy: {} tasks, {} failed{} in {:?}",
            self.strategy,
            self.task_count,
            self.failed,
            if self.cancelled { ", cancelled" } else { "" },
            self.duration
        )
    }
}

impl StructuredLog for ExecutionCompleted<'_> {
    fn log(&self) {
        if self.failed > 0 || self.cancelled {
            tracing::warn!(
                strategy = self.strategy,
                task_count = self.task_count,
                failed = self.failed,
                cancelled = self.cancelled,
                duration_ms = self.duration.as_millis() as u64,
                "{}", self
            );
        } else {
            tracing::info!(
                strategy = self.strategy,
                task_count = self.task_count,
                duration_ms = self.duration.as_millis() as u64,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution_completed",
            span_name = name,
            strategy = self.strategy,
            task_count = self.task_count,
            failed = self.failed,
            duration = ?self.duration,
        )
    }
}

/// A task is about to gather its inputs and consult the cache.
///
/// # Log Level
/// `debug!`
pub struct TaskStarted<'a> {
    pub annotator: &'a str,
    pub document_id: &'a str,
}

impl Display for TaskStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Running '{}' on document '{}'", self.annotator, self.document_id)
    }
}

impl StructuredLog for TaskStarted<'_> {
    fn log(&self) {
        tracing::debug!(annotator = self.annotator, document_id = self.document_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "task",
            span_name = name,
            annotator = self.annotator,
            document_id = self.document_id,
        )
    }
}

/// A task committed its output layers.
///
/// # Log Level
/// `debug!`
pub struct TaskCompleted<'a> {
    pub annotator: &'a str,
    pub document_id: &'a str,
    pub cache_hit: bool,
    pub duration: Duration,
}

impl Display for TaskCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "'{}' on document '{}' {} in {:?}",
            self.annotator,
            self.document_id,
            if self.cache_hit { "served from cache" } else { "computed" },
            self.duration
        )
    }
}

impl StructuredLog for TaskCompleted<'_> {
    fn log(&self) {
        tracing::debug!(
            annotator = self.annotator,
            document_id = self.document_id,
            cache_hit = self.cache_hit,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "task_completed",
            span_name = name,
            annotator = self.annotator,
            document_id = self.document_id,
            cache_hit = self.cache_hit,
        )
    }
}

/// A task failed. The error already carries the full task context.
///
/// # Log Level
/// `error!`
pub struct TaskFailed<'a> {
    pub annotator: &'a str,
    pub document_id: &'a str,
    pub error: &'a dyn Display,
}

impl Display for TaskFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Task failed: {}", self.error)
    }
}

impl StructuredLog for TaskFailed<'_> {
    fn log(&self) {
        tracing::error!(
            annotator = self.annotator,
            document_id = self.document_id,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "task_failed",
            span_name = name,
            annotator = self.annotator,
            document_id = self.document_id,
        )
    }
}

/// Fail-fast policy stopped scheduling after a failure.
///
/// # Log Level
/// `warn!`
pub struct SchedulingHalted<'a> {
    pub failed_task: &'a str,
    pub in_flight: usize,
}

impl Display for SchedulingHalted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stopping after failure of '{}'; waiting for {} in-flight tasks",
            self.failed_task, self.in_flight
        )
    }
}

impl StructuredLog for SchedulingHalted<'_> {
    fn log(&self) {
        tracing::warn!(failed_task = self.failed_task, in_flight = self.in_flight, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("scheduling_halted", span_name = name, failed_task = self.failed_task)
    }
}

/// The run was cancelled before every task started.
///
/// # Log Level
/// `warn!`
pub struct RunCancelled {
    pub not_started: usize,
}

impl Display for RunCancelled {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Run cancelled; {} tasks will not start", self.not_started)
    }
}

impl StructuredLog for RunCancelled {
    fn log(&self) {
        tracing::warn!(not_started = self.not_started, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("run_cancelled", span_name = name, not_started = self.not_started)
    }
}

/// Progress after a task finished: completed/total plus the job that just
/// finished.
///
/// # Log Level
/// `info!`
pub struct TaskProgress<'a> {
    pub completed: usize,
    pub total: usize,
    pub annotator: &'a str,
    pub document_id: &'a str,
}

impl TaskProgress<'_> {
    pub fn percent(&self) -> usize {
        if self.total == 0 {
            100
        } else {
            self.completed * 100 / self.total
        }
    }
}

impl Display for TaskProgress<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{}/{} {:>3}%] {} ({})",
            self.completed,
            self.total,
            self.percent(),
            self.annotator,
            self.document_id
        )
    }
}

impl StructuredLog for TaskProgress<'_> {
    fn log(&self) {
        tracing::info!(
            completed = self.completed,
            total = self.total,
            job = self.annotator,
            file = self.document_id,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "progress",
            span_name = name,
            completed = self.completed,
            total = self.total,
        )
    }
}
