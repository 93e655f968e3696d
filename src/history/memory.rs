//! In-memory trade history source

use super::{select_page, HistoryError, TradeHistoryService, TradeQueryOptions};
use crate::types::Trade;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Trade history backed by a vector, e.g. a previously exported trade log
#[derive(Debug, Clone, Default)]
pub struct MemoryTradeHistory {
    trades: Vec<Trade>,
}

impl MemoryTradeHistory {
    pub fn new(trades: Vec<Trade>) -> Self {
        Self { trades }
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}

#[async_trait]
impl TradeHistoryService for MemoryTradeHistory {
    async fn query_trades(
        &self,
        ctx: &CancellationToken,
        symbol: &str,
        options: &TradeQueryOptions,
    ) -> Result<Vec<Trade>, HistoryError> {
        if ctx.is_cancelled() {
            return Err(HistoryError::Cancelled);
        }
        Ok(select_page(&self.trades, symbol, options))
    }
}
