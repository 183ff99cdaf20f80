//! # Row Model
//!
//! One matched log record as the backing system returns it: an ordered
//! list of field/value pairs. The `@timestamp` field is mandatory — it
//! is the ordering key during extraction and the recovery key when a
//! window overflows the result cap.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::query::TIMESTAMP_FIELD;

/// One field of a matched record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowField {
    pub field: String,
    pub value: String,
}

/// One matched record: an ordered sequence of field/value pairs.
///
/// Serializes transparently as the array-of-pairs shape the backing
/// system uses on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    pub fields: Vec<RowField>,
}

impl Row {
    pub fn new(fields: Vec<RowField>) -> Self {
        Self { fields }
    }

    /// Build a row from `(field, value)` string pairs.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(field, value)| RowField {
                    field: (*field).to_string(),
                    value: (*value).to_string(),
                })
                .collect(),
        )
    }

    /// Value of the first field named `name`, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.field == name)
            .map(|f| f.value.as_str())
    }

    /// Raw `@timestamp` value.
    pub fn timestamp_str(&self) -> Option<&str> {
        self.field(TIMESTAMP_FIELD)
    }

    /// `@timestamp` parsed to epoch seconds, floored to the second.
    pub fn timestamp_epoch(&self) -> Option<i64> {
        self.timestamp_str().and_then(parse_timestamp)
    }
}

/// Parse a timestamp value as the backing system emits them, floored to
/// second resolution. Accepted shapes: `YYYY-MM-DD HH:MM:SS[.fff]` (the
/// result format), the `T`-separated equivalent, a bare date, and
/// RFC 3339. All values are treated as UTC.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt.and_utc().timestamp());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc().timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp());
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.timestamp())
}
