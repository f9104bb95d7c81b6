// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::engine::{TaskRecord, TaskRunner};
use crate::errors::{ExecutionError, FailureStrategy};

/// A scheduling strategy for a resolved task graph.
///
/// Implementations decide *when* each task runs; the shared [`TaskRunner`]
/// decides *how* (input gathering, cache lookup, producer invocation, commit).
/// Every task in the graph gets exactly one [`TaskRecord`] in the returned list.
///
/// An `Err` is only returned for internal failures of the scheduler itself.
/// Task failures are reported through the records.
#[async_trait]
pub trait DagExecutor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(
        &self,
        runner: TaskRunner,
        cancel: CancellationToken,
    ) -> Result<Vec<TaskRecord>, ExecutionError> {
        self.execute_with_strategy(runner, cancel, FailureStrategy::default())
            .await
    }

    /// Execute with a specific failure handling strategy.
    async fn execute_with_strategy(
        &self,
        runner: TaskRunner,
        cancel: CancellationToken,
        failure_strategy: FailureStrategy,
    ) -> Result<Vec<TaskRecord>, ExecutionError>;
}
