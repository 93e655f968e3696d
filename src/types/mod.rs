//! Core data types: markets, trades and query windows

pub mod market;
pub mod trade;

pub use market::Market;
pub use trade::{count_duplicate_keys, sort_trades_ascending, Side, Trade};

use chrono::{DateTime, Utc};
use std::fmt;

/// Query window: `since` is inclusive, `until` is exclusive.
/// Passed through to sources as given; no ordering check is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self { since, until }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}, {})", self.since.to_rfc3339(), self.until.to_rfc3339())
    }
}
