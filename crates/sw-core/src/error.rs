//! # Error Taxonomy
//!
//! Every failure in an extraction run maps to one of these variants.
//! All of them are fatal at the pipeline level: skipping a window would
//! silently corrupt the resume bookmark, so there is no skip-and-continue
//! path anywhere in the engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The query text violates a replication-safety rule. Surfaced
    /// before any network call and never retried.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Credential or session failure reported by the backing system.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Transport failure, malformed response, or a query that stayed in
    /// a terminal failure state after its one retry.
    #[error("backend error: {0}")]
    Backend(String),

    /// Overflow recovery made no forward progress: the sub-window
    /// starting at `start` still exceeds the result cap.
    #[error(
        "stuck in a loop: sub-window [{start}, {end}] still exceeds the \
         result cap; reduce the window increment"
    )]
    OverflowLoop { start: i64, end: i64 },

    /// A row carried no parseable `@timestamp` value. The timestamp is
    /// the recovery key, so a row without one cannot be repositioned.
    #[error("row is missing a parseable @timestamp value")]
    MissingTimestamp,
}
