// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structured logging for the annotation engine.
//!
//! Log events are message structs implementing `Display` plus
//! [`messages::StructuredLog`], so the wording of each event lives in one
//! place and every call site emits the same structured fields.
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - run lifecycle, task outcomes and progress
//! * `messages::cache` - cache hits, misses and recovery from bad entries
//! * `messages::resolution` - producer selection and plan construction
//!
//! # Usage
//!
//! ```rust
//! use annograph::observability::messages::engine::TaskProgress;
//! use annograph::observability::messages::StructuredLog;
//!
//! TaskProgress {
//!     completed: 3,
//!     total: 10,
//!     annotator: "postag",
//!     document_id: "doc1",
//! }
//! .log();
//! ```

pub mod messages;
