//! Profit statistics
//! Volume, fee and trade-count totals for one market, accumulated trade by trade

use super::TradeAccumulator;
use crate::types::{Market, Side, Trade};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Trade statistics of one market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitStats {
    pub symbol: String,
    pub base_currency: String,
    pub quote_currency: String,
    pub trade_count: u64,
    pub buy_count: u64,
    pub sell_count: u64,
    pub maker_count: u64,
    pub taker_count: u64,
    /// Base volume
    pub accumulated_volume: Decimal,
    pub accumulated_quote_volume: Decimal,
    pub accumulated_buy_volume: Decimal,
    pub accumulated_sell_volume: Decimal,
    pub accumulated_fees: BTreeMap<String, Decimal>,
    pub first_trade_time: Option<DateTime<Utc>>,
    pub last_trade_time: Option<DateTime<Utc>>,
    pub last_price: Option<Decimal>,
    /// UTC day of the most recent trade
    pub today: Option<NaiveDate>,
    pub today_volume: Decimal,
    pub today_trade_count: u64,
}

impl ProfitStats {
    /// Create empty stats for a market
    pub fn new(market: &Market) -> Self {
        Self {
            symbol: market.symbol.clone(),
            base_currency: market.base_currency.clone(),
            quote_currency: market.quote_currency.clone(),
            trade_count: 0,
            buy_count: 0,
            sell_count: 0,
            maker_count: 0,
            taker_count: 0,
            accumulated_volume: Decimal::ZERO,
            accumulated_quote_volume: Decimal::ZERO,
            accumulated_buy_volume: Decimal::ZERO,
            accumulated_sell_volume: Decimal::ZERO,
            accumulated_fees: BTreeMap::new(),
            first_trade_time: None,
            last_trade_time: None,
            last_price: None,
            today: None,
            today_volume: Decimal::ZERO,
            today_trade_count: 0,
        }
    }

    /// Record a trade.
    /// "Today" follows the trade's own UTC date so a replay reproduces it.
    pub fn record_trade(&mut self, trade: &Trade) {
        self.trade_count += 1;
        match trade.side {
            Side::Buy => {
                self.buy_count += 1;
                self.accumulated_buy_volume += trade.quantity;
            }
            Side::Sell => {
                self.sell_count += 1;
                self.accumulated_sell_volume += trade.quantity;
            }
        }
        if trade.is_maker {
            self.maker_count += 1;
        } else {
            self.taker_count += 1;
        }

        self.accumulated_volume += trade.quantity;
        self.accumulated_quote_volume += trade.quote_amount();

        if !trade.fee.is_zero() && !trade.fee_currency.is_empty() {
            *self
                .accumulated_fees
                .entry(trade.fee_currency.clone())
                .or_default() += trade.fee;
        }

        if self.first_trade_time.is_none() {
            self.first_trade_time = Some(trade.time);
        }
        self.last_trade_time = Some(trade.time);
        self.last_price = Some(trade.price);

        let day = trade.time.date_naive();
        if self.today != Some(day) {
            self.today = Some(day);
            self.today_volume = Decimal::ZERO;
            self.today_trade_count = 0;
        }
        self.today_volume += trade.quantity;
        self.today_trade_count += 1;
    }

    /// Get summary
    pub fn summary(&self) -> String {
        let fees = self
            .accumulated_fees
            .iter()
            .map(|(currency, amount)| format!("{} {}", amount, currency))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "Stats {}: trades={} (buy={}, sell={}, maker={}, taker={}), volume={} {} / {} {}, fees=[{}]",
            self.symbol,
            self.trade_count,
            self.buy_count,
            self.sell_count,
            self.maker_count,
            self.taker_count,
            self.accumulated_volume,
            self.base_currency,
            self.accumulated_quote_volume.round_dp(8),
            self.quote_currency,
            fees
        )
    }
}

impl TradeAccumulator for ProfitStats {
    fn add_trade(&mut self, trade: &Trade) {
        self.record_trade(trade);
    }
}
