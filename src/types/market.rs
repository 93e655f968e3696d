//! Market definition
//! Symbol plus the precision and step configuration used to format amounts

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A traded symbol and its precision/step configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub symbol: String,
    pub base_currency: String,
    pub quote_currency: String,
    /// Decimal places for prices
    #[serde(default = "default_precision")]
    pub price_precision: u32,
    /// Decimal places for quantities
    #[serde(default = "default_precision")]
    pub volume_precision: u32,
    /// Minimum price increment; zero means "use price_precision"
    #[serde(default)]
    pub tick_size: Decimal,
    /// Minimum quantity increment; zero means "use volume_precision"
    #[serde(default)]
    pub step_size: Decimal,
    #[serde(default)]
    pub min_quantity: Decimal,
    #[serde(default)]
    pub min_notional: Decimal,
}

fn default_precision() -> u32 {
    8
}

impl Market {
    /// Create a market with default precision and no step constraints
    pub fn new(symbol: &str, base_currency: &str, quote_currency: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            base_currency: base_currency.to_string(),
            quote_currency: quote_currency.to_string(),
            price_precision: default_precision(),
            volume_precision: default_precision(),
            tick_size: Decimal::ZERO,
            step_size: Decimal::ZERO,
            min_quantity: Decimal::ZERO,
            min_notional: Decimal::ZERO,
        }
    }

    /// Round a price down to the tick size (or price precision)
    pub fn truncate_price(&self, price: Decimal) -> Decimal {
        truncate_to(price, self.tick_size, self.price_precision)
    }

    /// Round a quantity down to the step size (or volume precision)
    pub fn truncate_quantity(&self, quantity: Decimal) -> Decimal {
        truncate_to(quantity, self.step_size, self.volume_precision)
    }

    pub fn format_price(&self, price: Decimal) -> String {
        format!("{:.*}", self.price_precision as usize, self.truncate_price(price))
    }

    pub fn format_quantity(&self, quantity: Decimal) -> String {
        format!(
            "{:.*}",
            self.volume_precision as usize,
            self.truncate_quantity(quantity)
        )
    }
}

fn truncate_to(value: Decimal, step: Decimal, precision: u32) -> Decimal {
    if step.is_zero() {
        return value.round_dp_with_strategy(precision, RoundingStrategy::ToZero);
    }
    ((value / step).trunc() * step).normalize()
}
