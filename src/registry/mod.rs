// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Annotator registry: producer manifests and the catalog that resolves an
//! output name to the annotator(s) able to produce it.

mod annotator_registry;
mod spec;

pub use annotator_registry::{AnnotatorRegistry, ProducerSelection, TieBreak};
pub use spec::{AnnotatorSpec, InputRef, ParamSpec, ParamType, ParamValue};
