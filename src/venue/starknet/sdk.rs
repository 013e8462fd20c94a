use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{Order, OrderSide, OrderType, Position};
use crate::error::Result;
use crate::venue::client_trait::Balance;

/// The narrow seam between the adapter and the venue's own (signing,
/// transport, session) SDK, per §1: "the adapter consumes it through the
/// narrow interface of §6". A real Starknet perpetual SDK client
/// implements this trait; the adapter never depends on its internals,
/// only on this async contract, mirroring the teacher's `SwapExecutor`
/// seam over the TON signer/transport.
#[async_trait]
pub trait StarknetSdk: Send + Sync + 'static {
    async fn fetch_ticker(&self, symbol: &str) -> anyhow::Result<(Decimal, Decimal, Decimal)>;
    async fn fetch_depth(&self, symbol: &str, limit: usize) -> anyhow::Result<(Vec<(Decimal, Decimal)>, Vec<(Decimal, Decimal)>)>;
    async fn fetch_balance(&self, currency: Option<&str>) -> anyhow::Result<Balance>;
    async fn fetch_position(&self, symbol: &str) -> anyhow::Result<Position>;
    #[allow(clippy::too_many_arguments)]
    async fn submit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        order_type: OrderType,
        quantity: Decimal,
        limit_price: Option<Decimal>,
        post_only: bool,
        reduce_only: bool,
    ) -> anyhow::Result<Order>;
    async fn cancel(&self, symbol: &str, order_id: &str) -> anyhow::Result<Order>;
    async fn fetch_open_orders(&self, symbol: Option<&str>) -> anyhow::Result<Vec<Order>>;

    fn into_result<T>(r: anyhow::Result<T>) -> Result<T> {
        r.map_err(|e| crate::error::Error::classify_venue_message(&e.to_string()))
    }
}
