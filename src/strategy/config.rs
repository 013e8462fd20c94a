use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Immutable-after-start grid parameters (§4.4). Validated once at
/// construction; the running strategy never re-reads these from disk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridConfig {
    pub order_size: Decimal,
    #[serde(default = "default_total_orders")]
    pub total_orders: u32,
    #[serde(default = "default_window_percent")]
    pub window_percent: Decimal,
    #[serde(default = "default_ratio")]
    pub sell_ratio: Decimal,
    #[serde(default = "default_ratio")]
    pub buy_ratio: Decimal,
    #[serde(default = "default_base_price_interval")]
    pub base_price_interval: Decimal,
    #[serde(default = "default_safe_gap")]
    pub safe_gap: Decimal,
    #[serde(default = "default_max_drift_buffer")]
    pub max_drift_buffer: Decimal,
    #[serde(default = "default_min_valid_price")]
    pub min_valid_price: Decimal,
    #[serde(default = "default_max_multiplier")]
    pub max_multiplier: Decimal,
    #[serde(default = "default_order_cooldown")]
    pub order_cooldown_secs: Decimal,
}

fn default_total_orders() -> u32 {
    18
}
fn default_window_percent() -> Decimal {
    dec!(0.12)
}
fn default_ratio() -> Decimal {
    dec!(0.5)
}
fn default_base_price_interval() -> Decimal {
    dec!(10)
}
fn default_safe_gap() -> Decimal {
    dec!(20)
}
fn default_max_drift_buffer() -> Decimal {
    dec!(2000)
}
fn default_min_valid_price() -> Decimal {
    dec!(10000)
}
fn default_max_multiplier() -> Decimal {
    dec!(15)
}
fn default_order_cooldown() -> Decimal {
    dec!(1.5)
}

impl GridConfig {
    pub fn validate(&self) -> Result<()> {
        if self.order_size <= Decimal::ZERO {
            return Err(Error::Validation("order_size must be positive".to_string()));
        }
        if self.total_orders == 0 {
            return Err(Error::Validation("total_orders must be positive".to_string()));
        }
        if self.sell_ratio < Decimal::ZERO || self.buy_ratio < Decimal::ZERO {
            return Err(Error::Validation(
                "sell_ratio and buy_ratio must be nonnegative".to_string(),
            ));
        }
        if self.base_price_interval <= Decimal::ZERO {
            return Err(Error::Validation(
                "base_price_interval must be positive".to_string(),
            ));
        }
        if self.max_multiplier <= Decimal::ZERO {
            return Err(Error::Validation("max_multiplier must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_order_size() {
        let mut c = sample();
        c.order_size = Decimal::ZERO;
        assert!(c.validate().is_err());
    }

    fn sample() -> GridConfig {
        GridConfig {
            order_size: dec!(1),
            total_orders: 18,
            window_percent: default_window_percent(),
            sell_ratio: dec!(0.5),
            buy_ratio: dec!(0.5),
            base_price_interval: dec!(10),
            safe_gap: dec!(20),
            max_drift_buffer: dec!(2000),
            min_valid_price: dec!(10000),
            max_multiplier: dec!(15),
            order_cooldown_secs: dec!(1.5),
        }
    }
}
