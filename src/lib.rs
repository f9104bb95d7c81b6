// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod annotators;    // built-in demo annotators
pub mod cache;         // content-addressed layer cache
pub mod config;        // config loading + runtime builder
pub mod corpus;        // documents and annotation layers
pub mod engine;        // task runner and DAG executors
pub mod errors;        // error handling
pub mod graph;         // run requests -> task graphs
pub mod observability;
pub mod registry;      // annotator catalog
pub mod traits;        // unified abstractions
