//! # Query Client Capability
//!
//! The abstract seam between the engine and the backing log-search
//! system. Everything the engine needs is two calls: submit a query over
//! a window, and poll it by handle. Implementations live outside this
//! crate (an HTTP client in `sw-cli`, a scripted fake in tests) and must
//! be safe for concurrent use — one shared handle serves every in-flight
//! subquery.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sw_core::{ExtractError, Row};

/// Opaque identifier for a submitted query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryHandle(pub String);

/// Execution state reported by the backing system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryStatus {
    Scheduled,
    Unknown,
    Running,
    Complete,
    Failed,
    Cancelled,
    Timeout,
}

impl QueryStatus {
    /// `Scheduled`, `Unknown`, and `Running` all mean "keep polling".
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete | Self::Failed | Self::Cancelled | Self::Timeout
        )
    }

    /// Terminal states other than `Complete`.
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled | Self::Timeout)
    }

    /// Map the backing system's status string. Anything unrecognized is
    /// `Unknown`, which keeps the poll loop going rather than failing on
    /// a status this client has never seen.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Scheduled" => Self::Scheduled,
            "Running" => Self::Running,
            "Complete" => Self::Complete,
            "Failed" => Self::Failed,
            "Cancelled" => Self::Cancelled,
            "Timeout" => Self::Timeout,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scheduled => "Scheduled",
            Self::Unknown => "Unknown",
            Self::Running => "Running",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
            Self::Timeout => "Timeout",
        };
        f.write_str(name)
    }
}

/// One poll response.
#[derive(Debug, Clone)]
pub struct QueryPoll {
    pub status: QueryStatus,
    /// True match count for the window. A float because the backing
    /// system reports it as one in its statistics block.
    pub records_matched: f64,
    /// Rows returned so far; only meaningful once `status` is
    /// [`QueryStatus::Complete`], and capped at the result limit.
    pub rows: Vec<Row>,
}

/// The capability every backing-system client must provide.
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Submit a query over `[start, end]` (inclusive epoch seconds)
    /// against one log group. Returns the handle to poll.
    async fn start_query(
        &self,
        log_group: &str,
        start: i64,
        end: i64,
        query_text: &str,
        limit: usize,
    ) -> Result<QueryHandle, ExtractError>;

    /// Poll a submitted query.
    async fn get_query_status(&self, handle: &QueryHandle) -> Result<QueryPoll, ExtractError>;
}
