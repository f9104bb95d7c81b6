// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.

pub mod cache;
pub mod engine;
pub mod resolution;

use tracing::Span;

/// A log event that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emit the event at its natural level.
    fn log(&self);

    /// A span carrying the same fields, for scoping follow-up events.
    fn span(&self, name: &str) -> Span;
}
