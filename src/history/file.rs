//! Trade history read from a JSON trade dump

use super::{select_page, HistoryError, TradeHistoryService, TradeQueryOptions};
use crate::types::Trade;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Trade history backed by a JSON array of trades on disk.
/// The file is re-read on every query so edits are picked up between runs.
#[derive(Debug, Clone)]
pub struct FileTradeHistory {
    path: PathBuf,
}

impl FileTradeHistory {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<Trade>, HistoryError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let trades: Vec<Trade> = serde_json::from_str(&content)?;
        debug!("Loaded {} trades from {}", trades.len(), self.path.display());
        Ok(trades)
    }
}

#[async_trait]
impl TradeHistoryService for FileTradeHistory {
    async fn query_trades(
        &self,
        ctx: &CancellationToken,
        symbol: &str,
        options: &TradeQueryOptions,
    ) -> Result<Vec<Trade>, HistoryError> {
        let trades = tokio::select! {
            _ = ctx.cancelled() => return Err(HistoryError::Cancelled),
            loaded = self.load() => loaded?,
        };
        Ok(select_page(&trades, symbol, options))
    }
}
