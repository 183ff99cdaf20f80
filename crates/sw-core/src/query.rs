//! # Query Validation
//!
//! Rejects query text that would break the ordering and resumability
//! guarantees of an extraction run, then canonicalizes accepted queries
//! by appending the deterministic sort clause.
//!
//! The rules are pure string inspection:
//!
//! - `sort` and `limit` stages are imposed internally and must not be
//!   user-controlled.
//! - Aggregation (`stats`) produces synthetic rows with no stable
//!   per-record timestamp, defeating resumability.
//! - The projection clause must select `@timestamp` — it is the
//!   replication key.

use std::fmt;

use crate::error::ExtractError;

/// The timestamp field every query must project.
pub const TIMESTAMP_FIELD: &str = "@timestamp";

/// Sort clause appended to every canonical query.
const SORT_SUFFIX: &str = " | sort @timestamp asc";

/// Check `query` against the replication-safety rules.
pub fn validate(query: &str) -> Result<(), ExtractError> {
    let squeezed = query.replace(' ', "");
    if squeezed.contains("|sort") {
        return Err(ExtractError::InvalidQuery("sort not allowed".into()));
    }
    if squeezed.contains("|limit") {
        return Err(ExtractError::InvalidQuery("limit not allowed".into()));
    }
    if query.contains("stats") {
        return Err(ExtractError::InvalidQuery("stats not allowed".into()));
    }
    let projection = query.split('|').next().unwrap_or(query);
    if !projection.contains(TIMESTAMP_FIELD) {
        return Err(ExtractError::InvalidQuery(
            "@timestamp is used as the replication key so it must be selected".into(),
        ));
    }
    Ok(())
}

/// A validated query with the sort clause appended.
///
/// Construction through [`CanonicalQuery::new`] is the only way to get
/// one, so holding a `CanonicalQuery` proves the text passed
/// [`validate`]. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalQuery(String);

impl CanonicalQuery {
    pub fn new(query: &str) -> Result<Self, ExtractError> {
        validate(query)?;
        Ok(Self(format!("{query}{SORT_SUFFIX}")))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
