use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::domain::Order;

/// Writer-dominated open-orders cache: `place_order`/`cancel_order` mutate
/// it inline, readers only consult it. Single-owner structure guarded by
/// one mutex, matching the cache-coherence design note.
pub struct OrdersCache {
    ttl: Duration,
    inner: Mutex<Inner>,
}

struct Inner {
    orders: HashMap<String, Order>,
    last_refresh: Option<Instant>,
}

impl OrdersCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(Inner {
                orders: HashMap::new(),
                last_refresh: None,
            }),
        }
    }

    /// True iff the cache has been populated at least once and the last
    /// refresh is within TTL as of `now`.
    pub fn is_fresh(&self, now: Instant) -> bool {
        let g = self.inner.lock();
        match g.last_refresh {
            Some(t) => now.duration_since(t) <= self.ttl,
            None => false,
        }
    }

    /// Returns open orders from the cache, optionally filtered by symbol,
    /// regardless of freshness — callers check `is_fresh` first.
    pub fn read_open(&self, symbol: Option<&str>) -> Vec<Order> {
        let g = self.inner.lock();
        g.orders
            .values()
            .filter(|o| o.status.is_open())
            .filter(|o| symbol.is_none_or(|s| o.symbol == s))
            .cloned()
            .collect()
    }

    /// Atomically rebuilds the cache from a fresh venue read.
    pub fn rebuild(&self, orders: Vec<Order>, now: Instant) {
        let mut g = self.inner.lock();
        g.orders = orders
            .into_iter()
            .map(|o| (o.venue_order_id.clone(), o))
            .collect();
        g.last_refresh = Some(now);
    }

    /// Inserts/updates a single order (place/query) and refreshes the
    /// timestamp so a subsequent cached read observes the effect
    /// immediately.
    pub fn upsert(&self, order: Order, now: Instant) {
        let mut g = self.inner.lock();
        g.orders.insert(order.venue_order_id.clone(), order);
        g.last_refresh = Some(now);
    }

    /// Removes an order (cancel) and refreshes the timestamp.
    pub fn remove(&self, order_id: &str, now: Instant) {
        let mut g = self.inner.lock();
        g.orders.remove(order_id);
        g.last_refresh = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderSide, OrderStatus, OrderType};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn mk_order(id: &str, symbol: &str, status: OrderStatus) -> Order {
        Order {
            venue_order_id: id.to_string(),
            client_order_id: None,
            symbol: symbol.to_string(),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            quantity: Decimal::ONE,
            limit_price: Some(Decimal::ONE),
            status,
            filled_quantity: Decimal::ZERO,
            average_fill_price: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            post_only: true,
            reduce_only: false,
        }
    }

    #[test]
    fn empty_cache_is_never_fresh() {
        let cache = OrdersCache::new(Duration::from_secs(5));
        assert!(!cache.is_fresh(Instant::now()));
    }

    #[test]
    fn fresh_within_ttl_stale_after() {
        let cache = OrdersCache::new(Duration::from_secs(5));
        let t0 = Instant::now();
        cache.rebuild(vec![], t0);
        assert!(cache.is_fresh(t0 + Duration::from_millis(4_999)));
        assert!(!cache.is_fresh(t0 + Duration::from_millis(5_001)));
    }

    #[test]
    fn upsert_and_remove_affect_cache_immediately() {
        let cache = OrdersCache::new(Duration::from_secs(5));
        let now = Instant::now();
        cache.upsert(mk_order("1", "BTC-USD", OrderStatus::New), now);
        assert_eq!(cache.read_open(None).len(), 1);

        cache.remove("1", now);
        assert_eq!(cache.read_open(None).len(), 0);
    }

    #[test]
    fn read_open_filters_by_status_and_symbol() {
        let cache = OrdersCache::new(Duration::from_secs(5));
        let now = Instant::now();
        cache.rebuild(
            vec![
                mk_order("1", "BTC-USD", OrderStatus::New),
                mk_order("2", "BTC-USD", OrderStatus::Filled),
                mk_order("3", "ETH-USD", OrderStatus::PartiallyFilled),
            ],
            now,
        );
        assert_eq!(cache.read_open(None).len(), 2);
        assert_eq!(cache.read_open(Some("BTC-USD")).len(), 1);
    }
}
