//! # Window Planner
//!
//! Partitions an arbitrary `[start, end]` range into fixed-size query
//! windows. The backing system treats both bounds of a query as
//! inclusive, so consecutive windows leave a one-second gap: scanning
//! the closing second of the previous window again would duplicate
//! every row that landed in it.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// How far behind the clock the latest queryable second sits. Rows can
/// take a few minutes to land in the backing system; querying right up
/// to `now` would mark windows complete before all their rows arrived.
pub const INGEST_LAG_MINUTES: i64 = 5;

/// A bounded time range submitted as one query.
///
/// Both bounds are inclusive, at second resolution (epoch seconds).
///
/// # Invariant
///
/// `start <= end`. The planner only produces windows satisfying this;
/// overflow recovery shrinks `start` forward but never past `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Window length in seconds (inclusive bounds, so a one-second
    /// window has duration 0).
    #[inline]
    pub fn duration_s(&self) -> i64 {
        self.end - self.start
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{} UTC` - `{} UTC`", iso(self.start), iso(self.end))
    }
}

fn iso(epoch_s: i64) -> String {
    match DateTime::from_timestamp(epoch_s, 0) {
        Some(dt) => dt.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string(),
        None => epoch_s.to_string(),
    }
}

/// Split `[start, end]` into `ceil((end - start) / increment_s)` windows.
///
/// Window 0 starts exactly at `start` (the true start second must be
/// scanned); every later window starts one second after the previous
/// window's end. All windows are clamped so none extends past `end`.
///
/// Pure function of its inputs; an empty range yields no windows.
pub fn plan_windows(start: i64, end: i64, increment_s: i64) -> Vec<TimeWindow> {
    assert!(increment_s > 0, "window increment must be positive");

    let diff_s = end - start;
    let total = diff_s / increment_s + i64::from(diff_s % increment_s != 0);

    (0..total)
        .map(|i| {
            let window_start = if i == 0 {
                start
            } else {
                start + increment_s * i + 1
            };
            let window_end = (start + increment_s * (i + 1)).min(end);
            TimeWindow::new(window_start, window_end)
        })
        .collect()
}

/// The effective upper bound of an extraction run:
/// `min(requested_or_now, now - 5 minutes)`.
///
/// An explicit end past the lag boundary is clamped back to it; an end
/// already behind the boundary passes through unchanged.
pub fn effective_end(requested: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    let latest_safe = now - Duration::minutes(INGEST_LAG_MINUTES);
    match requested {
        Some(end) => end.min(latest_safe),
        None => latest_safe,
    }
}
