//! # Extraction Pipeline
//!
//! Top-level orchestration: validate the query, compute the effective
//! end time, plan the windows, drain the scheduler, and flatten each
//! window's batch into individual rows. Validation and planning happen
//! before any network call; any failure after that point is fatal for
//! the whole run, because a skipped window would silently corrupt the
//! resume bookmark.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use sw_core::{window, CanonicalQuery, ExtractError, Row};

use crate::client::QueryClient;
use crate::record::{map_record, Record};
use crate::scheduler::WindowScheduler;

/// Values the engine consumes. Loading them (config file, CLI flags,
/// environment) is the caller's concern.
#[derive(Debug, Clone)]
pub struct ExtractorSettings {
    pub log_group: String,
    /// Raw query text; validated and canonicalized at extraction time.
    pub query: String,
    /// Window length in seconds.
    pub window_increment_s: i64,
    /// Bound on subqueries in flight at once.
    pub max_concurrent_subqueries: usize,
}

impl ExtractorSettings {
    pub fn new(log_group: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            log_group: log_group.into(),
            query: query.into(),
            window_increment_s: 3600,
            max_concurrent_subqueries: 20,
        }
    }
}

pub struct Extractor {
    client: Arc<dyn QueryClient>,
    settings: ExtractorSettings,
}

impl Extractor {
    pub fn new(client: Arc<dyn QueryClient>, settings: ExtractorSettings) -> Self {
        Self { client, settings }
    }

    /// Plan and launch an extraction resuming from `bookmark`.
    ///
    /// The returned stream is lazy, ordered, and finite. It is not
    /// restartable mid-run; a new call re-plans from the given bookmark.
    pub fn extract(
        &self,
        bookmark: DateTime<Utc>,
        end_override: Option<DateTime<Utc>>,
    ) -> Result<RecordStream, ExtractError> {
        self.extract_at(Utc::now(), bookmark, end_override)
    }

    /// [`Extractor::extract`] with the clock supplied by the caller, so
    /// planning is a pure function of its inputs.
    pub fn extract_at(
        &self,
        now: DateTime<Utc>,
        bookmark: DateTime<Utc>,
        end_override: Option<DateTime<Utc>>,
    ) -> Result<RecordStream, ExtractError> {
        let query = CanonicalQuery::new(&self.settings.query)?;
        let end = window::effective_end(end_override, now);
        let windows = window::plan_windows(
            bookmark.timestamp(),
            end.timestamp(),
            self.settings.window_increment_s,
        );
        tracing::info!(
            "Planned {} window(s) from {} to {}",
            windows.len(),
            bookmark.to_rfc3339(),
            end.to_rfc3339()
        );

        let scheduler = WindowScheduler::new(
            self.client.clone(),
            self.settings.log_group.clone(),
            query,
            windows,
            self.settings.max_concurrent_subqueries,
        );
        Ok(RecordStream::new(scheduler))
    }
}

/// Lazy, ordered stream of extracted rows.
///
/// Rows come out in window submission order, each window's rows sorted
/// by the canonical sort clause. The running maximum `@timestamp` is
/// tracked at second grain; once the stream is drained it is the safe
/// resume bookmark. Mapped output is deliberately not re-verified as
/// strictly sorted: overflow sub-windows re-scan their boundary second,
/// so a millisecond-grain value can dip below the maximum already seen.
pub struct RecordStream {
    scheduler: WindowScheduler,
    current: std::vec::IntoIter<Row>,
    bookmark: Option<i64>,
    failed: bool,
}

impl RecordStream {
    fn new(scheduler: WindowScheduler) -> Self {
        Self {
            scheduler,
            current: Vec::new().into_iter(),
            bookmark: None,
            failed: false,
        }
    }

    /// The next row, or `None` once every planned window has drained.
    /// A failure poisons the stream; later calls keep failing.
    pub async fn next_row(&mut self) -> Result<Option<Row>, ExtractError> {
        if self.failed {
            return Err(ExtractError::Backend(
                "extraction already failed; re-plan from the last bookmark".into(),
            ));
        }
        loop {
            if let Some(row) = self.current.next() {
                if let Some(ts) = row.timestamp_epoch() {
                    self.bookmark = Some(self.bookmark.map_or(ts, |b| b.max(ts)));
                }
                return Ok(Some(row));
            }
            match self.scheduler.next_batch().await {
                Some(Ok(batch)) => self.current = batch.into_iter(),
                Some(Err(err)) => {
                    self.failed = true;
                    return Err(err);
                }
                None => return Ok(None),
            }
        }
    }

    /// The next row mapped to its output [`Record`] form.
    pub async fn next_record(&mut self) -> Result<Option<Record>, ExtractError> {
        Ok(self.next_row().await?.map(|row| map_record(&row)))
    }

    /// Maximum `@timestamp` observed so far, floored to the second.
    /// Monotonic for the lifetime of the stream.
    pub fn max_timestamp(&self) -> Option<DateTime<Utc>> {
        self.bookmark.and_then(|s| DateTime::from_timestamp(s, 0))
    }
}
