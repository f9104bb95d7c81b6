// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Corpus model: documents, spans and annotation layers.

mod loader;
mod model;

pub use loader::load_corpus;
pub use model::{Annotation, AnnotationLayer, CommittedLayer, Corpus, Document, Span};
pub(crate) use model::sha256_hex;
