//! Paged trade history query
//! Turns one time-range query into as many page requests as the source needs

use super::{HistoryError, TradeHistoryService, TradeQueryOptions};
use crate::types::{TimeRange, Trade};
use crate::utils::RateLimiter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Batch query configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchQueryConfig {
    /// Maximum trades requested per page (default: 1000)
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
    /// Minimum delay between page requests in milliseconds (default: 0)
    #[serde(default)]
    pub page_delay_ms: u64,
}

fn default_page_limit() -> usize {
    1000
}

impl Default for BatchQueryConfig {
    fn default() -> Self {
        Self {
            page_limit: default_page_limit(),
            page_delay_ms: 0,
        }
    }
}

/// Pages through one session's trade history for a window
pub struct TradeBatchQuery {
    service: Arc<dyn TradeHistoryService>,
    config: BatchQueryConfig,
    limiter: RateLimiter,
}

impl TradeBatchQuery {
    pub fn new(service: Arc<dyn TradeHistoryService>, config: BatchQueryConfig) -> Self {
        let limiter = RateLimiter::new(Duration::from_millis(config.page_delay_ms));
        Self {
            service,
            config,
            limiter,
        }
    }

    /// Fetch every trade of `symbol` inside `range`.
    ///
    /// Pages are requested with a (time, id) cursor taken from the last trade of
    /// the previous page. Trades already returned by an earlier page are dropped.
    /// The loop ends on a short page, a page with nothing new, or once the
    /// cursor reaches the end of the window. The token is checked before every
    /// page and raced against every request.
    pub async fn query_trades(
        &self,
        ctx: &CancellationToken,
        symbol: &str,
        range: TimeRange,
    ) -> Result<Vec<Trade>, HistoryError> {
        let mut trades = Vec::new();
        let mut seen: HashSet<u64> = HashSet::new();
        let mut options = TradeQueryOptions {
            start_time: Some(range.since),
            end_time: Some(range.until),
            limit: self.config.page_limit,
            last_trade_id: None,
        };
        let mut pages = 0usize;
        self.limiter.reset().await;

        loop {
            if ctx.is_cancelled() {
                return Err(HistoryError::Cancelled);
            }

            tokio::select! {
                _ = ctx.cancelled() => return Err(HistoryError::Cancelled),
                _ = self.limiter.wait() => {}
            }

            let page = tokio::select! {
                _ = ctx.cancelled() => return Err(HistoryError::Cancelled),
                page = self.service.query_trades(ctx, symbol, &options) => page?,
            };
            pages += 1;

            let page_len = page.len();
            let Some(last) = page.last() else {
                break;
            };
            let cursor = (last.time, last.id);

            let before = trades.len();
            trades.extend(page.into_iter().filter(|t| seen.insert(t.id)));
            let added = trades.len() - before;

            debug!(
                "{} page {}: {} trades ({} new), cursor {} #{}",
                symbol,
                pages,
                page_len,
                added,
                cursor.0.to_rfc3339(),
                cursor.1
            );

            if added == 0
                || self.config.page_limit == 0
                || page_len < self.config.page_limit
                || cursor.0 >= range.until
            {
                break;
            }

            options.start_time = Some(cursor.0);
            options.last_trade_id = Some(cursor.1);
        }

        debug!("{} batch query done: {} trades in {} pages", symbol, trades.len(), pages);
        Ok(trades)
    }
}
