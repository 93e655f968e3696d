//! Trade history sources
//! One `TradeHistoryService` per exchange session, plus the batch query that pages through it

pub mod batch;
pub mod file;
pub mod memory;

pub use batch::{BatchQueryConfig, TradeBatchQuery};
pub use file::FileTradeHistory;
pub use memory::MemoryTradeHistory;

use crate::types::Trade;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[cfg(test)]
use mockall::automock;

/// Errors returned by a trade history source
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Query cancelled")]
    Cancelled,
}

impl HistoryError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, HistoryError::Cancelled)
    }
}

/// Parameters for one page of trade history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradeQueryOptions {
    /// Inclusive lower bound on trade time
    pub start_time: Option<DateTime<Utc>>,
    /// Exclusive upper bound on trade time
    pub end_time: Option<DateTime<Utc>>,
    /// Maximum number of trades to return; 0 means no limit
    pub limit: usize,
    /// When set, only trades strictly after (start_time, last_trade_id) are returned
    pub last_trade_id: Option<u64>,
}

/// Trade history capability of one exchange session
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TradeHistoryService: Send + Sync {
    /// Fetch one page of trades for `symbol`, ordered by (time, id)
    async fn query_trades(
        &self,
        ctx: &CancellationToken,
        symbol: &str,
        options: &TradeQueryOptions,
    ) -> Result<Vec<Trade>, HistoryError>;
}

/// Select one page out of a trade list.
/// Shared by the in-process sources so they agree on window and cursor semantics.
pub(crate) fn select_page(trades: &[Trade], symbol: &str, options: &TradeQueryOptions) -> Vec<Trade> {
    let mut page: Vec<Trade> = trades
        .iter()
        .filter(|t| t.symbol == symbol)
        .filter(|t| options.end_time.map_or(true, |end| t.time < end))
        .filter(|t| match (options.start_time, options.last_trade_id) {
            (Some(start), Some(last_id)) => (t.time, t.id) > (start, last_id),
            (Some(start), None) => t.time >= start,
            (None, Some(last_id)) => t.id > last_id,
            (None, None) => true,
        })
        .cloned()
        .collect();

    page.sort_by(|a, b| a.time.cmp(&b.time).then(a.id.cmp(&b.id)));
    if options.limit > 0 {
        page.truncate(options.limit);
    }
    page
}
