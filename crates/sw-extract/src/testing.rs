//! Scripted in-memory stand-in for the backing system: each window gets
//! a queue of poll responses, consumed in order. Also records call
//! counts and the high-water mark of concurrently running queries so
//! scheduler tests can assert the concurrency bound.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sw_core::{ExtractError, Row};

use crate::client::{QueryClient, QueryHandle, QueryPoll, QueryStatus};

/// One scripted poll response, answered after `delay`.
pub(crate) struct Step {
    pub delay: Duration,
    pub poll: QueryPoll,
}

impl Step {
    pub fn complete(records_matched: f64, rows: Vec<Row>) -> Self {
        Self {
            delay: Duration::ZERO,
            poll: QueryPoll {
                status: QueryStatus::Complete,
                records_matched,
                rows,
            },
        }
    }

    pub fn status(status: QueryStatus) -> Self {
        Self {
            delay: Duration::ZERO,
            poll: QueryPoll {
                status,
                records_matched: 0.0,
                rows: Vec::new(),
            },
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Default)]
pub(crate) struct FakeClient {
    scripts: Mutex<HashMap<(i64, i64), VecDeque<Step>>>,
    pub start_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue poll responses for the window `[start, end]`.
    pub fn script(&self, start: i64, end: i64, steps: Vec<Step>) {
        self.scripts
            .lock()
            .expect("scripts lock")
            .entry((start, end))
            .or_default()
            .extend(steps);
    }
}

#[async_trait]
impl QueryClient for FakeClient {
    async fn start_query(
        &self,
        _log_group: &str,
        start: i64,
        end: i64,
        _query_text: &str,
        _limit: usize,
    ) -> Result<QueryHandle, ExtractError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        Ok(QueryHandle(format!("{start}:{end}")))
    }

    async fn get_query_status(&self, handle: &QueryHandle) -> Result<QueryPoll, ExtractError> {
        let (start, end) = handle
            .0
            .split_once(':')
            .map(|(s, e)| {
                (
                    s.parse::<i64>().expect("handle start"),
                    e.parse::<i64>().expect("handle end"),
                )
            })
            .expect("handle shape");

        let step = self
            .scripts
            .lock()
            .expect("scripts lock")
            .get_mut(&(start, end))
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| panic!("no scripted response for window [{start}, {end}]"));

        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        if step.poll.status.is_terminal() {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(step.poll)
    }
}
