//! # Subquery Executor
//!
//! Drives one planned window through the backing system's submit/poll
//! protocol and repairs result-cap overflow.
//!
//! State machine per window:
//! `Created -> Submitted -> Polling -> {Complete | Failed/Cancelled/Timeout}`.
//! A terminal failure is retried exactly once by re-submitting the same
//! window; a second terminal failure is non-recoverable.
//!
//! # Overflow recovery
//!
//! The backing system silently drops rows past the result cap, so a
//! window whose true match count exceeds the cap cannot be trusted.
//! Recovery re-queries `[last row timestamp, original end]` — inclusive
//! on both ends, so rows tied on the boundary second are scanned again
//! (duplicates are tolerated, missed ties are not) — and repeats until
//! the match count fits. The loop is iterative with an explicit
//! no-forward-progress guard: a sub-window whose computed start equals
//! the start just queried fails with [`ExtractError::OverflowLoop`].

use std::sync::Arc;
use std::time::Duration;

use sw_core::{CanonicalQuery, ExtractError, Row, TimeWindow};

use crate::client::{QueryClient, QueryHandle, QueryPoll, QueryStatus};

/// The backing system's hard limit on rows returned per query.
pub const RESULT_CAP: usize = 10_000;

/// Fixed delay between poll attempts. The control plane is rate
/// limited; polling tighter than this buys nothing.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Runs one planned window to completion. Owned by exactly one
/// scheduler slot; consumed by [`Subquery::run`].
pub struct Subquery {
    client: Arc<dyn QueryClient>,
    window: TimeWindow,
    log_group: String,
    query: CanonicalQuery,
    limit: usize,
}

impl Subquery {
    pub fn new(
        client: Arc<dyn QueryClient>,
        window: TimeWindow,
        log_group: String,
        query: CanonicalQuery,
    ) -> Self {
        Self {
            client,
            window,
            log_group,
            query,
            limit: RESULT_CAP,
        }
    }

    /// Run the window to completion, returning every matched row in
    /// timestamp order (overflow sub-batches concatenated after the
    /// parent's partial rows).
    pub async fn run(mut self) -> Result<Vec<Row>, ExtractError> {
        let original_end = self.window.end;
        let mut rows = Vec::new();

        loop {
            let poll = self.run_window().await?;

            if poll.records_matched <= self.limit as f64 {
                rows.extend(poll.rows);
                return Ok(rows);
            }

            tracing::info!(
                "Result set size '{}' exceeded limit '{}'. Re-running sub-batch...",
                poll.records_matched as u64,
                self.limit
            );
            let last_ts = poll
                .rows
                .last()
                .and_then(Row::timestamp_epoch)
                .ok_or(ExtractError::MissingTimestamp)?;
            rows.extend(poll.rows);

            if last_ts == self.window.start {
                return Err(ExtractError::OverflowLoop {
                    start: self.window.start,
                    end: original_end,
                });
            }
            // The last received second is scanned again so tied rows
            // beyond the cap are not lost.
            self.window = TimeWindow::new(last_ts, original_end);
        }
    }

    /// One submit/poll cycle with a single retry on terminal failure.
    async fn run_window(&self) -> Result<QueryPoll, ExtractError> {
        let mut handle = self.submit().await?;
        tracing::info!("Retrieving results for batch from: {}", self.window);

        let mut retried = false;
        let mut first = true;
        loop {
            if !first {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            first = false;

            let poll = self.client.get_query_status(&handle).await?;
            match poll.status {
                QueryStatus::Complete => {
                    tracing::info!(
                        "Result set size '{}' received.",
                        poll.records_matched as u64
                    );
                    return Ok(poll);
                }
                QueryStatus::Failed | QueryStatus::Cancelled | QueryStatus::Timeout => {
                    if retried {
                        return Err(ExtractError::Backend(format!(
                            "query for batch {} ended {} after retry",
                            self.window, poll.status
                        )));
                    }
                    tracing::info!("Status: {}. Retrying...", poll.status);
                    handle = self.submit().await?;
                    retried = true;
                }
                QueryStatus::Scheduled | QueryStatus::Unknown => {
                    tracing::info!("Status: {}, continuing to poll.", poll.status);
                }
                QueryStatus::Running => {}
            }
        }
    }

    async fn submit(&self) -> Result<QueryHandle, ExtractError> {
        tracing::info!("Submitting query for batch from: {}", self.window);
        self.client
            .start_query(
                &self.log_group,
                self.window.start,
                self.window.end,
                self.query.as_str(),
                self.limit,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeClient, Step};
    use std::sync::atomic::Ordering;

    fn subquery(client: Arc<FakeClient>, start: i64, end: i64) -> Subquery {
        let query = CanonicalQuery::new("fields @timestamp, @message").expect("valid query");
        Subquery::new(client, TimeWindow::new(start, end), "my_log_group_name".into(), query)
    }

    fn row(ts: &str, message: &str) -> Row {
        Row::from_pairs(&[("@timestamp", ts), ("@message", message)])
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_complete() {
        let client = Arc::new(FakeClient::new());
        let rows = vec![row("2022-12-29 00:30:00", "abc")];
        client.script(
            1672272000,
            1672275600,
            vec![
                Step::status(QueryStatus::Running),
                Step::status(QueryStatus::Scheduled),
                Step::complete(10_000.0, rows.clone()),
            ],
        );

        let out = subquery(client.clone(), 1672272000, 1672275600)
            .run()
            .await
            .expect("subquery succeeds");
        assert_eq!(out, rows);
        assert_eq!(client.start_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_failure_retries_once() {
        for status in [QueryStatus::Failed, QueryStatus::Cancelled, QueryStatus::Timeout] {
            let client = Arc::new(FakeClient::new());
            let rows = vec![row("2022-12-29 00:30:00", "abc")];
            client.script(
                1672272000,
                1672275600,
                vec![Step::status(status), Step::complete(1.0, rows.clone())],
            );

            let out = subquery(client.clone(), 1672272000, 1672275600)
                .run()
                .await
                .expect("retry recovers");
            assert_eq!(out, rows);
            assert_eq!(client.start_calls.load(Ordering::SeqCst), 2);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_terminal_failure_is_fatal() {
        for status in [QueryStatus::Failed, QueryStatus::Cancelled, QueryStatus::Timeout] {
            let client = Arc::new(FakeClient::new());
            client.script(
                1672272000,
                1672275600,
                vec![Step::status(status), Step::status(status)],
            );

            let err = subquery(client.clone(), 1672272000, 1672275600)
                .run()
                .await
                .expect_err("second failure escalates");
            assert!(matches!(err, ExtractError::Backend(_)), "got {err:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflow_requeries_from_last_timestamp() {
        let client = Arc::new(FakeClient::new());
        let first_batch = vec![
            row("2022-12-29 00:10:00", "a"),
            row("2022-12-29 00:30:00", "b"),
        ];
        let second_batch = vec![row("2022-12-29 00:45:00", "c")];
        client.script(
            1672272000,
            1672275600,
            vec![Step::complete(10_001.0, first_batch.clone())],
        );
        // Sub-window starts at the last received timestamp (00:30:00).
        client.script(
            1672273800,
            1672275600,
            vec![Step::complete(3.0, second_batch.clone())],
        );

        let out = subquery(client.clone(), 1672272000, 1672275600)
            .run()
            .await
            .expect("overflow recovery succeeds");

        let mut expected = first_batch;
        expected.extend(second_batch);
        assert_eq!(out, expected);
        assert_eq!(client.start_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflow_without_forward_progress_is_fatal() {
        let client = Arc::new(FakeClient::new());
        // Every remaining row shares the window's start second, so the
        // computed sub-window start never advances.
        client.script(
            1672272000,
            1672275600,
            vec![Step::complete(
                10_001.0,
                vec![row("2022-12-29 00:00:00", "tied")],
            )],
        );

        let err = subquery(client.clone(), 1672272000, 1672275600)
            .run()
            .await
            .expect_err("stuck loop detected");
        assert!(
            matches!(
                err,
                ExtractError::OverflowLoop {
                    start: 1672272000,
                    end: 1672275600
                }
            ),
            "got {err:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflow_with_unparseable_timestamp_is_fatal() {
        let client = Arc::new(FakeClient::new());
        client.script(
            1672272000,
            1672275600,
            vec![Step::complete(
                10_001.0,
                vec![Row::from_pairs(&[("@message", "no timestamp")])],
            )],
        );

        let err = subquery(client.clone(), 1672272000, 1672275600)
            .run()
            .await
            .expect_err("missing timestamp detected");
        assert!(matches!(err, ExtractError::MissingTimestamp), "got {err:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_match_count_at_cap_is_not_overflow() {
        let client = Arc::new(FakeClient::new());
        let rows = vec![row("2022-12-29 00:30:00", "abc")];
        client.script(
            1672272000,
            1672275600,
            vec![Step::complete(10_000.0, rows.clone())],
        );

        let out = subquery(client.clone(), 1672272000, 1672275600)
            .run()
            .await
            .expect("cap-sized result is final");
        assert_eq!(out, rows);
        assert_eq!(client.start_calls.load(Ordering::SeqCst), 1);
    }
}
