// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod builder;
mod cycle;
mod dag;
mod request;

pub use builder::GraphBuilder;
pub use cycle::find_cycle;
pub use dag::{DependencyGraph, TaskId, TaskNode};
pub use request::{ParameterOverrides, RunRequest};
