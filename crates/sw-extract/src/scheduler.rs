//! # Window Scheduler
//!
//! Runs planned windows with bounded parallelism while preserving their
//! submission order in the output. A FIFO of in-flight tasks: submit
//! while below capacity, then await the *oldest* task — not the first
//! one to finish — so batch *i* always corresponds to window *i*. The
//! downstream bookmark depends on monotonically increasing timestamps,
//! which makes completion-order yielding unusable here; the FIFO trades
//! a little latency for that guarantee.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::task::JoinHandle;

use sw_core::{CanonicalQuery, ExtractError, Row, TimeWindow};

use crate::client::QueryClient;
use crate::subquery::Subquery;

pub struct WindowScheduler {
    client: Arc<dyn QueryClient>,
    log_group: String,
    query: CanonicalQuery,
    pending: VecDeque<TimeWindow>,
    in_flight: VecDeque<JoinHandle<Result<Vec<Row>, ExtractError>>>,
    max_concurrent: usize,
}

impl WindowScheduler {
    /// # Panics
    /// Panics if `max_concurrent` is zero.
    pub fn new(
        client: Arc<dyn QueryClient>,
        log_group: String,
        query: CanonicalQuery,
        windows: Vec<TimeWindow>,
        max_concurrent: usize,
    ) -> Self {
        assert!(max_concurrent >= 1, "concurrency bound must be at least 1");
        Self {
            client,
            log_group,
            query,
            pending: windows.into(),
            in_flight: VecDeque::new(),
            max_concurrent,
        }
    }

    /// Windows not yet yielded (pending plus in flight).
    #[inline]
    pub fn remaining(&self) -> usize {
        self.pending.len() + self.in_flight.len()
    }

    /// The next batch in submission order, or `None` once every window
    /// has been yielded. Lazily submits work: nothing runs until the
    /// first call.
    pub async fn next_batch(&mut self) -> Option<Result<Vec<Row>, ExtractError>> {
        self.top_up();
        let oldest = self.in_flight.pop_front()?;
        match oldest.await {
            Ok(result) => Some(result),
            Err(err) => Some(Err(ExtractError::Backend(format!(
                "subquery task failed: {err}"
            )))),
        }
    }

    /// Submit pending windows until the in-flight queue is at capacity.
    fn top_up(&mut self) {
        while self.in_flight.len() < self.max_concurrent {
            let Some(window) = self.pending.pop_front() else {
                break;
            };
            let subquery = Subquery::new(
                self.client.clone(),
                window,
                self.log_group.clone(),
                self.query.clone(),
            );
            self.in_flight.push_back(tokio::spawn(subquery.run()));
        }
    }
}

impl Drop for WindowScheduler {
    /// An abandoned run has no consumer for its results; stop the
    /// in-flight queries instead of letting them poll on detached.
    fn drop(&mut self) {
        for handle in &self.in_flight {
            handle.abort();
        }
    }
}
