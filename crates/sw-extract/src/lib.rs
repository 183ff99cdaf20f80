//! # sw-extract — The extraction engine of SPILLWAY
//!
//! Drives a query-based, asynchronous log-search API (no cursors, no
//! streaming) and turns it into an ordered, resumable stream of rows:
//!
//! 1. [`pipeline::Extractor`] validates the query, computes the
//!    lag-adjusted end time, and plans the windows.
//! 2. [`scheduler::WindowScheduler`] keeps a bounded number of windows
//!    in flight and yields their results strictly in submission order.
//! 3. [`subquery::Subquery`] runs one window through the submit/poll
//!    protocol, retrying once on terminal failure and repairing
//!    result-cap overflow by re-querying shrinking sub-windows.
//!
//! The backing API is reached only through the [`client::QueryClient`]
//! capability, so any concurrency-safe implementation plugs in.

pub mod client;
pub mod pipeline;
pub mod record;
pub mod scheduler;
pub mod subquery;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{QueryClient, QueryHandle, QueryPoll, QueryStatus};
pub use pipeline::{Extractor, ExtractorSettings, RecordStream};
pub use record::{map_record, Record};
pub use scheduler::WindowScheduler;
pub use subquery::{Subquery, RESULT_CAP};
