use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{Depth, Order, OrderSide, OrderType, Position, Ticker};
use crate::error::Result;

/// Balance snapshot for one currency.
#[derive(Clone, Copy, Debug, Default)]
pub struct Balance {
    pub available: Decimal,
    pub frozen: Decimal,
    pub total: Decimal,
}

/// The synchronous-facade capability set a venue must provide. A single
/// concrete `StarknetPerpClient` implements this today; the trait exists
/// so a second venue kind can be added without touching callers, mirroring
/// the source's adapter-factory indirection replaced per the redesign
/// notes with a capability interface.
///
/// Every method here is, in the implementing type, backed by a call into
/// one of the two persistent executors described in the component design
/// — never a per-call spin-up of an async runtime.
#[async_trait]
pub trait VenueClient: Send + Sync {
    /// Never propagates: any internal error is logged and a zero-valued
    /// ticker returned.
    async fn get_ticker(&self, symbol: &str) -> Ticker;

    /// Never propagates: any internal error is logged and an empty depth
    /// returned.
    async fn get_depth(&self, symbol: &str, limit: usize) -> Depth;

    /// Never propagates: returns a zeroed balance on failure.
    async fn get_balance(&self, currency: Option<&str>) -> Balance;

    /// Never propagates: returns an empty (flat) position on transient
    /// error; logging is rate-limited/suppressed for timeout errors by
    /// the caller (PositionManager), not by the adapter itself.
    async fn get_position(&self, symbol: &str) -> Result<Position>;

    /// Propagates validation and classified venue errors.
    #[allow(clippy::too_many_arguments)]
    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        order_type: OrderType,
        quantity: Decimal,
        limit_price: Option<Decimal>,
        post_only: bool,
        reduce_only: bool,
    ) -> Result<Order>;

    /// Propagates; timeouts are classified as `Error::Connectivity`.
    async fn cancel_order(&self, symbol: &str, order_id: &str) -> Result<Order>;

    /// Returns cached open orders when fresh; refreshes and rebuilds the
    /// cache atomically on miss or when `use_cache` is false. Returns
    /// stale cache data (rather than erroring) if a forced refresh fails
    /// and a cache already exists.
    async fn get_open_orders(&self, symbol: Option<&str>, use_cache: bool) -> Result<Vec<Order>>;

    /// Stops the executors and closes the underlying SDK session. Close
    /// failures are the caller's (Instance Pool's) responsibility to log,
    /// not raise.
    async fn close(&self) -> Result<()>;
}
