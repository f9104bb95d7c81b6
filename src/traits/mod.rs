// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod annotator;
pub mod executor;

pub use annotator::{Annotator, AnnotatorInput, FnAnnotator, LayerSet};
pub use executor::DagExecutor;
