// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod annotation_engine;
pub mod factory;
pub mod level_by_level;
pub mod priority_work_queue;
mod run_result;
mod task_runner;
mod tracker;
pub mod work_queue;

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
pub(crate) mod test_support;

pub use annotation_engine::Engine;
pub use factory::ExecutorFactory;
pub use level_by_level::LevelByLevelExecutor;
pub use run_result::{RunResult, TaskRecord, TaskStatus};
pub use task_runner::{TaskOutcome, TaskRunner};
pub use work_queue::WorkQueueExecutor;
