// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::FALLBACK_CONCURRENCY;
use crate::config::{EngineConfig, Strategy};
use crate::engine::level_by_level::LevelByLevelExecutor;
use crate::engine::work_queue::WorkQueueExecutor;
use crate::traits::DagExecutor;

/// Factory for creating DAG executors from configuration
pub struct ExecutorFactory;

impl ExecutorFactory {
    /// Create a DAG executor based on the configuration strategy
    pub fn from_config(cfg: &EngineConfig) -> Box<dyn DagExecutor> {
        let max_concurrency = cfg.executor_options.max_concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(FALLBACK_CONCURRENCY)
        });

        match cfg.strategy {
            Strategy::WorkQueue => Box::new(WorkQueueExecutor::new(max_concurrency)),
            Strategy::Level => Box::new(LevelByLevelExecutor::new(max_concurrency)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_selects_executor() {
        let cases = [(Strategy::WorkQueue, "work_queue"), (Strategy::Level, "level")];
        for (strategy, expected) in cases {
            let cfg = EngineConfig {
                strategy,
                ..serde_yaml::from_str("{}").unwrap()
            };
            assert_eq!(ExecutorFactory::from_config(&cfg).name(), expected);
        }
    }
}
