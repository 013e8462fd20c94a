use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(self) -> OrderSide {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Market,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Unknown,
}

impl OrderStatus {
    /// True for statuses counted as "open" by the adapter's cache filter.
    pub fn is_open(self) -> bool {
        matches!(self, OrderStatus::New | OrderStatus::PartiallyFilled)
    }
}

/// A normalized order as returned by the venue adapter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub venue_order_id: String,
    pub client_order_id: Option<String>,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub limit_price: Option<Decimal>,
    pub status: OrderStatus,
    pub filled_quantity: Decimal,
    pub average_fill_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub post_only: bool,
    pub reduce_only: bool,
}

impl Order {
    /// Post-only safety per the data model invariant: a limit order must
    /// never be marketable. `bid`/`ask` are the live quotes at submission
    /// time; `safe_gap` is the configured minimum clearance.
    pub fn is_post_only_safe(&self, bid: Decimal, ask: Decimal, safe_gap: Decimal) -> bool {
        let Some(price) = self.limit_price else {
            return true;
        };
        match self.side {
            OrderSide::Buy => price <= bid - safe_gap,
            OrderSide::Sell => price >= ask + safe_gap,
        }
    }
}
