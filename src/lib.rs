//! Profit Fixer - trade-history based profit and position reconciliation
//!
//! Features:
//! - Parallel trade history queries across exchange sessions
//! - Deterministic chronological merge
//! - All-or-nothing replay into profit statistics and position

pub mod config;
pub mod fixer;
pub mod history;
pub mod session;
pub mod trading;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::{Config, LogFormat, SessionConfig};
pub use fixer::{FixError, FixReport, ProfitFixer};
pub use history::{
    BatchQueryConfig, FileTradeHistory, HistoryError, MemoryTradeHistory, TradeBatchQuery,
    TradeHistoryService, TradeQueryOptions,
};
pub use session::SessionRegistry;
pub use trading::{Position, Profit, ProfitStats, TradeAccumulator};
pub use types::{Market, Side, TimeRange, Trade};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
