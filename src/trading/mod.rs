//! Trading module
//! Accumulators fed by trade replay: profit statistics and position

pub mod position;
pub mod stats;

pub use position::{Position, Profit};
pub use stats::ProfitStats;

use crate::types::Trade;

/// Order-sensitive state that consumes trades one at a time.
/// Callers feed trades in ascending replay order, each exactly once.
pub trait TradeAccumulator {
    fn add_trade(&mut self, trade: &Trade);
}
