//! Executed trade records and their replay order

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Trade side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// +1 for buys, -1 for sells
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Buy => Decimal::ONE,
            Side::Sell => Decimal::NEGATIVE_ONE,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// An executed trade as reported by an exchange session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Exchange-assigned trade id, stable across queries
    pub id: u64,
    #[serde(default)]
    pub order_id: u64,
    /// Exchange (or session) the trade was reported by
    #[serde(default)]
    pub exchange: String,
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    /// Price * quantity; derived when the exchange omits it
    #[serde(default)]
    pub quote_quantity: Decimal,
    #[serde(default)]
    pub fee: Decimal,
    #[serde(default)]
    pub fee_currency: String,
    #[serde(default)]
    pub is_maker: bool,
    pub time: DateTime<Utc>,
}

impl Trade {
    /// Quote amount of the trade, falling back to price * quantity
    pub fn quote_amount(&self) -> Decimal {
        if self.quote_quantity.is_zero() {
            self.price * self.quantity
        } else {
            self.quote_quantity
        }
    }

    pub fn is_buy(&self) -> bool {
        self.side == Side::Buy
    }

    /// Total order used for replay: time, then trade id, then exchange
    pub fn replay_cmp(&self, other: &Trade) -> Ordering {
        self.time
            .cmp(&other.time)
            .then(self.id.cmp(&other.id))
            .then_with(|| self.exchange.cmp(&other.exchange))
    }

    /// Whether two trades share the replay key and are therefore indistinguishable
    pub fn same_replay_key(&self, other: &Trade) -> bool {
        self.replay_cmp(other) == Ordering::Equal
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} #{} {} {} {} @ {} fee {} {} at {}",
            self.exchange,
            self.id,
            self.symbol,
            self.side,
            self.quantity,
            self.price,
            self.fee,
            self.fee_currency,
            self.time.to_rfc3339()
        )
    }
}

/// Sort trades into replay order (ascending time, ties by id then exchange)
pub fn sort_trades_ascending(trades: &mut [Trade]) {
    trades.sort_by(|a, b| a.replay_cmp(b));
}

/// Count trades that share a replay key with their predecessor.
/// Expects a sorted slice.
pub fn count_duplicate_keys(sorted: &[Trade]) -> usize {
    sorted
        .windows(2)
        .filter(|pair| pair[0].same_replay_key(&pair[1]))
        .count()
}
