//! Average-cost position tracking

use super::TradeAccumulator;
use crate::types::{Market, Trade};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Profit realized by a single trade that reduced or closed the position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profit {
    pub symbol: String,
    pub trade_id: u64,
    /// Quantity that was closed against the existing position
    pub quantity: Decimal,
    pub price: Decimal,
    pub average_cost: Decimal,
    /// Gross realized profit in quote currency
    pub profit: Decimal,
    /// Realized profit minus this trade's fee (in quote)
    pub net_profit: Decimal,
    pub fee_in_quote: Decimal,
    pub time: DateTime<Utc>,
}

/// Position of one market, built by replaying trades in order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub base_currency: String,
    pub quote_currency: String,
    /// Signed base quantity: positive long, negative short
    pub base: Decimal,
    /// Net quote flow (negative after buying)
    pub quote: Decimal,
    pub average_cost: Decimal,
    /// Realized gross profit in quote currency
    pub accumulated_profit: Decimal,
    /// Every fee paid, converted to quote at the trade price when possible
    pub accumulated_fee_in_quote: Decimal,
    /// Raw fees per currency
    pub fees: BTreeMap<String, Decimal>,
    pub trade_count: u64,
    pub opened_at: Option<DateTime<Utc>>,
    pub changed_at: Option<DateTime<Utc>>,
}

impl Position {
    /// Create an empty position for a market
    pub fn new(market: &Market) -> Self {
        Self {
            symbol: market.symbol.clone(),
            base_currency: market.base_currency.clone(),
            quote_currency: market.quote_currency.clone(),
            base: Decimal::ZERO,
            quote: Decimal::ZERO,
            average_cost: Decimal::ZERO,
            accumulated_profit: Decimal::ZERO,
            accumulated_fee_in_quote: Decimal::ZERO,
            fees: BTreeMap::new(),
            trade_count: 0,
            opened_at: None,
            changed_at: None,
        }
    }

    pub fn is_long(&self) -> bool {
        self.base.is_sign_positive() && !self.base.is_zero()
    }

    pub fn is_short(&self) -> bool {
        self.base.is_sign_negative() && !self.base.is_zero()
    }

    pub fn is_closed(&self) -> bool {
        self.base.is_zero()
    }

    /// Realized profit net of all fees
    pub fn net_profit(&self) -> Decimal {
        self.accumulated_profit - self.accumulated_fee_in_quote
    }

    /// Absolute position value at `price`
    pub fn exposure(&self, price: Decimal) -> Decimal {
        self.base.abs() * price
    }

    /// Profit the open quantity would realize at `price`
    pub fn unrealized_profit(&self, price: Decimal) -> Decimal {
        (price - self.average_cost) * self.base
    }

    fn fee_in_quote(&self, trade: &Trade) -> Decimal {
        if trade.fee_currency == self.quote_currency {
            trade.fee
        } else if trade.fee_currency == self.base_currency {
            trade.fee * trade.price
        } else {
            Decimal::ZERO
        }
    }

    /// Apply a trade and return the profit it realized, if any.
    ///
    /// Trades on the side of the open position (or on a flat position) move the
    /// average cost. Opposite trades realize profit on the closed quantity and
    /// flip the position when they exceed it. A base-currency fee is folded into
    /// the traded quantity first: a buy receives `quantity - fee`, a sell gives
    /// away `quantity + fee`.
    pub fn add_trade_with_profit(&mut self, trade: &Trade) -> Option<Profit> {
        let price = trade.price;
        let sign = trade.side.sign();
        let fee_in_quote = self.fee_in_quote(trade);
        let quantity = if trade.fee_currency == self.base_currency {
            trade.quantity - sign * trade.fee
        } else {
            trade.quantity
        };

        if !trade.fee.is_zero() && !trade.fee_currency.is_empty() {
            *self.fees.entry(trade.fee_currency.clone()).or_default() += trade.fee;
        }
        self.accumulated_fee_in_quote += fee_in_quote;
        self.trade_count += 1;
        self.changed_at = Some(trade.time);

        self.quote -= sign * trade.quote_amount();
        if trade.fee_currency == self.quote_currency {
            self.quote -= trade.fee;
        }

        let same_direction = self.base.is_zero() || self.is_long() == trade.is_buy();
        let mut realized = None;

        if same_direction {
            let held = self.base.abs();
            let total = held + quantity;
            if !total.is_zero() {
                self.average_cost = (held * self.average_cost + quantity * price) / total;
            }
            if self.base.is_zero() {
                self.opened_at = Some(trade.time);
            }
            self.base += sign * quantity;
        } else {
            let held = self.base.abs();
            let closed = quantity.min(held);
            let profit = if self.is_long() {
                (price - self.average_cost) * closed
            } else {
                (self.average_cost - price) * closed
            };
            self.accumulated_profit += profit;

            realized = Some(Profit {
                symbol: trade.symbol.clone(),
                trade_id: trade.id,
                quantity: closed,
                price,
                average_cost: self.average_cost,
                profit,
                net_profit: profit - fee_in_quote,
                fee_in_quote,
                time: trade.time,
            });

            if quantity > held {
                self.base = sign * (quantity - held);
                self.average_cost = price;
                self.opened_at = Some(trade.time);
            } else {
                self.base += sign * quantity;
                if self.base.is_zero() {
                    self.average_cost = Decimal::ZERO;
                    self.opened_at = None;
                }
            }
        }

        realized
    }

    /// Get summary
    pub fn summary(&self) -> String {
        format!(
            "Position {}: base={} {}, average cost={}, realized={} {}, fees={} {}, net={} {}, trades={}",
            self.symbol,
            self.base,
            self.base_currency,
            self.average_cost.round_dp(8),
            self.accumulated_profit.round_dp(8),
            self.quote_currency,
            self.accumulated_fee_in_quote.round_dp(8),
            self.quote_currency,
            self.net_profit().round_dp(8),
            self.quote_currency,
            self.trade_count
        )
    }
}

impl TradeAccumulator for Position {
    fn add_trade(&mut self, trade: &Trade) {
        self.add_trade_with_profit(trade);
    }
}
