//! Trade-history based profit fixer
//!
//! Rebuilds profit statistics and position state for one market by fetching
//! every session's trades for a window in parallel, merging them into a single
//! chronological sequence and replaying that sequence into the accumulators.
//!
//! A run is all or nothing: if any session fails (or the token is cancelled)
//! the accumulators are never touched.

use crate::history::{BatchQueryConfig, HistoryError, TradeBatchQuery, TradeHistoryService};
use crate::session::SessionRegistry;
use crate::trading::TradeAccumulator;
use crate::types::{count_duplicate_keys, sort_trades_ascending, Market, TimeRange, Trade};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Errors returned by a fix run
#[derive(Error, Debug)]
pub enum FixError {
    /// A session's trade history source failed
    #[error("Session {session}: {source}")]
    Fetch {
        session: String,
        #[source]
        source: HistoryError,
    },

    /// The run was cancelled through the caller's token
    #[error("Reconciliation cancelled")]
    Cancelled,

    /// A fetch task panicked or was aborted
    #[error("Fetch task failed: {reason}")]
    TaskFailed { reason: String },
}

impl FixError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FixError::Cancelled)
    }

    /// Session that produced the error, when known
    pub fn session(&self) -> Option<&str> {
        match self {
            FixError::Fetch { session, .. } => Some(session),
            _ => None,
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixReport {
    pub sessions: usize,
    pub trades: usize,
    /// Trades sharing a (time, id, exchange) key with another trade
    pub duplicates: usize,
}

/// Trade-history based profit fixer for one market
pub struct ProfitFixer {
    market: Market,
    sessions: SessionRegistry,
    batch: BatchQueryConfig,
}

impl ProfitFixer {
    pub fn new(market: Market) -> Self {
        Self::with_batch_config(market, BatchQueryConfig::default())
    }

    pub fn with_batch_config(market: Market, batch: BatchQueryConfig) -> Self {
        Self {
            market,
            sessions: SessionRegistry::new(),
            batch,
        }
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Register (or replace) the trade history source of a session
    pub fn add_exchange(&mut self, session_name: &str, service: Arc<dyn TradeHistoryService>) {
        if self.sessions.contains(session_name) {
            debug!("Replacing trade history source of session {}", session_name);
        }
        self.sessions.insert(session_name, service);
    }

    /// Fetch, merge and replay every session's trades in `[since, until)`.
    ///
    /// `stats` receives each trade before `position`. Neither is touched unless
    /// every session's fetch succeeded. Running the same window twice adds the
    /// same trades twice.
    pub async fn fix<S, P>(
        &self,
        ctx: &CancellationToken,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        stats: &mut S,
        position: &mut P,
    ) -> Result<FixReport, FixError>
    where
        S: TradeAccumulator + ?Sized,
        P: TradeAccumulator + ?Sized,
    {
        let range = TimeRange::new(since, until);
        let span = info_span!("profit_fixer", run = %Uuid::new_v4(), symbol = %self.market.symbol);

        async move {
            if ctx.is_cancelled() {
                return Err(FixError::Cancelled);
            }

            let sessions = self.sessions.len();
            let mut trades = self.fetch_all(ctx, range).await?;

            sort_trades_ascending(&mut trades);
            let duplicates = count_duplicate_keys(&trades);
            if duplicates > 0 {
                warn!(
                    "{} trades share a (time, id, exchange) key with another trade; replaying them anyway",
                    duplicates
                );
            }

            for trade in &trades {
                stats.add_trade(trade);
                position.add_trade(trade);
            }

            info!(
                "Replayed {} {} trades from {} sessions over {}",
                trades.len(),
                self.market.symbol,
                sessions,
                range
            );

            Ok(FixReport {
                sessions,
                trades: trades.len(),
                duplicates,
            })
        }
        .instrument(span)
        .await
    }

    /// Fan out one batch query per session and wait for all of them.
    /// The first failure cancels the remaining queries and is returned.
    async fn fetch_all(
        &self,
        ctx: &CancellationToken,
        range: TimeRange,
    ) -> Result<Vec<Trade>, FixError> {
        let group = ctx.child_token();
        let buffer: Arc<Mutex<Vec<Trade>>> = Arc::new(Mutex::new(Vec::with_capacity(1000)));
        let mut tasks = JoinSet::new();

        for (session, service) in self.sessions.snapshot() {
            let group = group.clone();
            let buffer = buffer.clone();
            let symbol = self.market.symbol.clone();
            let query = TradeBatchQuery::new(service, self.batch.clone());

            tasks.spawn(
                async move {
                    info!(
                        "Batch querying {} trade history from {} over {}",
                        symbol, session, range
                    );

                    match query.query_trades(&group, &symbol, range).await {
                        Ok(trades) => {
                            debug!("Session {} returned {} trades", session, trades.len());
                            buffer.lock().await.extend(trades);
                            Ok(())
                        }
                        Err(HistoryError::Cancelled) => {
                            debug!("Session {} query cancelled", session);
                            Err(FixError::Cancelled)
                        }
                        Err(err) => {
                            error!("Unable to batch query trades from {}: {}", session, err);
                            Err(FixError::Fetch {
                                session,
                                source: err,
                            })
                        }
                    }
                }
                .in_current_span(),
            );
        }

        let mut first_error: Option<FixError> = None;
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.unwrap_or_else(|err| {
                Err(FixError::TaskFailed {
                    reason: err.to_string(),
                })
            });

            if let Err(err) = outcome {
                match first_error {
                    None => {
                        group.cancel();
                        first_error = Some(err);
                    }
                    Some(_) => debug!("Discarding later fetch error: {}", err),
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        let merged = std::mem::take(&mut *buffer.lock().await);
        Ok(merged)
    }
}
