use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::domain::{Order, OrderSide, OrderType};
use crate::error::Result;
use crate::venue::VenueClient;

/// One cancel outcome within a batch. Errors on individual cancels do not
/// abort the batch.
#[derive(Debug)]
pub struct CancelOutcome {
    pub order_id: String,
    pub error: Option<String>,
}

/// Forwards to the venue adapter, defaulting limit orders to post-only and
/// keeping a local cache of orders this manager itself submitted.
/// Grounded on `original_source/core/order_manager.py`.
pub struct OrderManager {
    client: Arc<dyn VenueClient>,
    local_orders: Mutex<HashMap<String, Order>>,
}

impl OrderManager {
    pub fn new(client: Arc<dyn VenueClient>) -> Self {
        Self {
            client,
            local_orders: Mutex::new(HashMap::new()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        order_type: OrderType,
        quantity: Decimal,
        limit_price: Option<Decimal>,
        post_only: Option<bool>,
        reduce_only: bool,
    ) -> Result<Order> {
        let post_only = match order_type {
            OrderType::Limit => post_only.unwrap_or(true),
            OrderType::Market => false,
        };

        let order = self
            .client
            .place_order(
                symbol,
                side,
                order_type,
                quantity,
                limit_price,
                post_only,
                reduce_only,
            )
            .await?;

        self.local_orders
            .lock()
            .insert(order.venue_order_id.clone(), order.clone());
        Ok(order)
    }

    pub async fn cancel_order(&self, symbol: &str, order_id: &str) -> Result<Order> {
        let order = self.client.cancel_order(symbol, order_id).await?;
        self.local_orders
            .lock()
            .insert(order.venue_order_id.clone(), order.clone());
        Ok(order)
    }

    /// Passthrough to the venue adapter's cached open-orders read, used by
    /// the strategy core at the start of each tick (§4.4 step 1).
    pub async fn get_open_orders(&self, symbol: Option<&str>, use_cache: bool) -> Result<Vec<Order>> {
        self.client.get_open_orders(symbol, use_cache).await
    }

    pub fn local_orders(&self, symbol: Option<&str>) -> Vec<Order> {
        self.local_orders
            .lock()
            .values()
            .filter(|o| symbol.is_none_or(|s| o.symbol == s))
            .cloned()
            .collect()
    }

    /// Enumerates venue-open orders and cancels each individually,
    /// collecting per-order success/failure without aborting the batch.
    pub async fn cancel_all_orders(&self, symbol: Option<&str>) -> Result<Vec<CancelOutcome>> {
        let open = self.client.get_open_orders(symbol, false).await?;
        let mut outcomes = Vec::with_capacity(open.len());

        for order in open {
            match self
                .client
                .cancel_order(&order.symbol, &order.venue_order_id)
                .await
            {
                Ok(cancelled) => {
                    self.local_orders
                        .lock()
                        .insert(cancelled.venue_order_id.clone(), cancelled);
                    outcomes.push(CancelOutcome {
                        order_id: order.venue_order_id,
                        error: None,
                    });
                }
                Err(e) => outcomes.push(CancelOutcome {
                    order_id: order.venue_order_id,
                    error: Some(e.to_string()),
                }),
            }
        }

        Ok(outcomes)
    }
}
