use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Ticker {
    pub last_price: Decimal,
    pub best_bid: Decimal,
    pub best_bid_size: Decimal,
    pub best_ask: Decimal,
    pub best_ask_size: Decimal,
}

impl Ticker {
    pub fn zero() -> Self {
        Self {
            last_price: Decimal::ZERO,
            best_bid: Decimal::ZERO,
            best_bid_size: Decimal::ZERO,
            best_ask: Decimal::ZERO,
            best_ask_size: Decimal::ZERO,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.best_bid.is_zero() && self.best_ask.is_zero()
    }

    pub fn mid(&self) -> Decimal {
        (self.best_bid + self.best_ask) / Decimal::from(2)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: Decimal,
    pub size: Decimal,
}

/// A depth snapshot. Invariant: `best_bid < best_ask` must hold or the
/// snapshot is discarded by the caller before use.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Depth {
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
}

impl Depth {
    pub fn is_crossed_or_empty(&self) -> bool {
        match (self.bids.first(), self.asks.first()) {
            (Some(b), Some(a)) => b.price >= a.price,
            _ => true,
        }
    }
}
