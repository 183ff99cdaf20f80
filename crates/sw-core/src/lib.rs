//! # sw-core — The data model of SPILLWAY
//!
//! Pure, I/O-free building blocks for windowed log extraction: time
//! windows and the planner that produces them, query validation and
//! canonicalization, the row model with its timestamp key, and the
//! error taxonomy shared by every layer above.
//!
//! Nothing in this crate touches the network or the clock; callers pass
//! `now` in explicitly, which keeps planning deterministic and testable.

pub mod error;
pub mod query;
pub mod row;
pub mod window;

pub use error::ExtractError;
pub use query::CanonicalQuery;
pub use row::{Row, RowField};
pub use window::TimeWindow;
