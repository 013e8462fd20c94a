use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::domain::{OrderSide, OrderType};
use crate::error::{Error, Result};
use crate::managers::Managers;
use crate::strategy::config::GridConfig;
use crate::strategy::ladder::{
    adjust_ratios, build_ladder, count_split, group_open_orders, plan_diff, CancelTarget,
};
use crate::venue::VenueClient;

const UPDATE_INTERVAL: Duration = Duration::from_secs(3);
const INTER_CANCEL_PAUSE: Duration = Duration::from_millis(500);
const STOP_JOIN_DEADLINE: Duration = Duration::from_secs(5);

/// The strategy state machine of §4.4: `stopped -> running -> stopping ->
/// stopped`, and any state `-> terminal` via delete.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyState {
    Stopped,
    Running,
    Stopping,
    Terminal,
}

#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct StatusSnapshot {
    pub state: Option<StrategyState>,
    pub last_tick_error: Option<String>,
    pub ticks_run: u64,
    pub orders_placed: u64,
    pub orders_cancelled: u64,
}

/// Outcome of `stop`: cancel/close failures are captured rather than
/// aborting the transition to `stopped` (§4.4 "Stop semantics").
#[derive(Debug, Default)]
pub struct StopReport {
    pub cancels_succeeded: usize,
    pub cancels_failed: usize,
    pub closing_order_error: Option<String>,
}

/// A single `(account, symbol)` sliding-window grid instance. Constructed
/// once by the Strategy Registry, which holds it behind an `Arc` so the
/// background cadence task and external callers (tick-now, status) share
/// the same state.
pub struct GridStrategy {
    pub id: String,
    pub account_key: String,
    pub symbol: String,
    config: GridConfig,
    client: Arc<dyn VenueClient>,
    managers: Arc<Managers>,

    state: RwLock<StrategyState>,
    status: RwLock<StatusSnapshot>,
    last_order_time: Mutex<Option<Instant>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stop_signal: Arc<Notify>,
}

impl GridStrategy {
    pub fn new(
        id: String,
        account_key: String,
        symbol: String,
        config: GridConfig,
        client: Arc<dyn VenueClient>,
        managers: Arc<Managers>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            id,
            account_key,
            symbol,
            config,
            client,
            managers,
            state: RwLock::new(StrategyState::Stopped),
            status: RwLock::new(StatusSnapshot::default()),
            last_order_time: Mutex::new(None),
            worker: Mutex::new(None),
            stop_signal: Arc::new(Notify::new()),
        })
    }

    pub fn state(&self) -> StrategyState {
        *self.state.read()
    }

    pub fn status(&self) -> StatusSnapshot {
        let mut snapshot = self.status.read().clone();
        snapshot.state = Some(self.state());
        snapshot
    }

    /// Runs one reconciliation tick synchronously, then spawns the
    /// cadence worker. Rejects if not currently `stopped`.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        {
            let mut state = self.state.write();
            if *state != StrategyState::Stopped {
                return Err(Error::Validation(format!(
                    "strategy {} is not stopped, cannot start",
                    self.id
                )));
            }
            *state = StrategyState::Running;
        }

        if let Err(e) = self.tick().await {
            tracing::error!(strategy_id = %self.id, error = %e, "initial tick failed");
            self.status.write().last_tick_error = Some(e.to_string());
        }

        let this = self.clone();
        let stop_signal = self.stop_signal.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop_signal.notified() => break,
                    _ = tokio::time::sleep(UPDATE_INTERVAL) => {
                        if let Err(e) = this.tick().await {
                            tracing::error!(strategy_id = %this.id, error = %e, "tick failed");
                            this.status.write().last_tick_error = Some(e.to_string());
                        }
                    }
                }
            }
        });

        *self.worker.lock() = Some(handle);
        Ok(())
    }

    /// Only valid from `stopped`; otherwise rejected (§4.4 "Restart").
    pub async fn restart(self: &Arc<Self>) -> Result<()> {
        if self.state() != StrategyState::Stopped {
            return Err(Error::Validation(format!(
                "strategy {} must be stopped before restart",
                self.id
            )));
        }
        self.start().await
    }

    /// Signals the worker, waits with a 5s deadline, cancels every open
    /// order for the symbol, and flattens any residual position.
    pub async fn stop(&self) -> StopReport {
        *self.state.write() = StrategyState::Stopping;
        self.stop_signal.notify_one();

        if let Some(handle) = self.worker.lock().take() {
            if tokio::time::timeout(STOP_JOIN_DEADLINE, handle)
                .await
                .is_err()
            {
                tracing::warn!(strategy_id = %self.id, "worker did not join within deadline");
            }
        }

        let mut report = StopReport::default();

        match self.managers.orders.cancel_all_orders(Some(&self.symbol)).await {
            Ok(outcomes) => {
                for o in outcomes {
                    if o.error.is_some() {
                        report.cancels_failed += 1;
                    } else {
                        report.cancels_succeeded += 1;
                    }
                }
            }
            Err(e) => {
                tracing::error!(strategy_id = %self.id, error = %e, "failed to enumerate open orders for cancel");
                report.cancels_failed += 1;
            }
        }

        let position = self.managers.position.get_position(&self.symbol).await;
        let signed = position.signed_quantity();
        if !signed.is_zero() {
            let side = if signed > Decimal::ZERO {
                OrderSide::Sell
            } else {
                OrderSide::Buy
            };
            if let Err(e) = self
                .managers
                .orders
                .place_order(
                    &self.symbol,
                    side,
                    OrderType::Market,
                    signed.abs(),
                    None,
                    Some(false),
                    true,
                )
                .await
            {
                report.closing_order_error = Some(e.to_string());
            }
        }

        *self.state.write() = StrategyState::Stopped;
        report
    }

    pub async fn delete(self: &Arc<Self>) -> StopReport {
        let report = if self.state() == StrategyState::Running {
            self.stop().await
        } else {
            StopReport::default()
        };
        *self.state.write() = StrategyState::Terminal;
        report
    }

    /// The per-tick algorithm of §4.4 steps 1-8.
    pub async fn tick(&self) -> Result<()> {
        let ticker = self.client.get_ticker(&self.symbol).await;
        if ticker.is_zero() {
            return Err(Error::Connectivity(
                "ticker unavailable, skipping tick".to_string(),
            ));
        }
        let open_orders = self
            .managers
            .orders
            .get_open_orders(Some(&self.symbol), true)
            .await?;

        let mid = ticker.mid();
        let half_window = mid * self.config.window_percent / Decimal::from(2);

        let position = self.managers.position.get_position(&self.symbol).await;
        let signed = position.signed_quantity();

        let ratios = adjust_ratios(
            self.config.buy_ratio,
            self.config.sell_ratio,
            signed,
            self.config.order_size,
            self.config.max_multiplier,
        );
        let (sell_count, buy_count) = count_split(self.config.total_orders, ratios.sell_ratio);

        let mut groups = group_open_orders(&open_orders);
        let ladder = build_ladder(
            mid,
            ticker.best_bid,
            ticker.best_ask,
            half_window,
            self.config.base_price_interval,
            self.config.safe_gap,
            self.config.max_drift_buffer,
            self.config.min_valid_price,
            sell_count,
            buy_count,
        );

        let plan = plan_diff(
            &ladder,
            sell_count as usize,
            buy_count as usize,
            &groups,
            mid,
            self.config.safe_gap,
            self.config.total_orders as usize,
        );

        self.apply_cancels(&plan.to_cancel).await;

        let ticker = self.client.get_ticker(&self.symbol).await;
        let open_orders = self
            .managers
            .orders
            .get_open_orders(Some(&self.symbol), false)
            .await?;
        groups = group_open_orders(&open_orders);

        let mid = ticker.mid();
        let half_window = mid * self.config.window_percent / Decimal::from(2);
        let ladder = build_ladder(
            mid,
            ticker.best_bid,
            ticker.best_ask,
            half_window,
            self.config.base_price_interval,
            self.config.safe_gap,
            self.config.max_drift_buffer,
            self.config.min_valid_price,
            sell_count,
            buy_count,
        );
        let final_plan = plan_diff(
            &ladder,
            sell_count as usize,
            buy_count as usize,
            &groups,
            mid,
            self.config.safe_gap,
            self.config.total_orders as usize,
        );

        self.apply_placements(OrderSide::Buy, &final_plan.to_place_buys).await;
        self.apply_placements(OrderSide::Sell, &final_plan.to_place_sells).await;

        self.status.write().ticks_run += 1;
        Ok(())
    }

    async fn apply_cancels(&self, targets: &[CancelTarget]) {
        let open = self
            .managers
            .orders
            .get_open_orders(Some(&self.symbol), false)
            .await
            .unwrap_or_default();

        for (i, target) in targets.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(INTER_CANCEL_PAUSE).await;
            }

            let order_id = match &target.order_id {
                Some(id) => Some(id.clone()),
                None => open
                    .iter()
                    .find(|o| o.side == target.side && o.limit_price == Some(target.price))
                    .map(|o| o.venue_order_id.clone()),
            };

            let Some(order_id) = order_id else {
                tracing::warn!(strategy_id = %self.id, side = ?target.side, price = %target.price, "no live order found for cancel target");
                continue;
            };

            match self.managers.orders.cancel_order(&self.symbol, &order_id).await {
                Ok(_) => self.status.write().orders_cancelled += 1,
                Err(e) => tracing::warn!(strategy_id = %self.id, order_id = %order_id, error = %e, "cancel failed"),
            }
        }
    }

    async fn apply_placements(&self, side: OrderSide, prices: &[Decimal]) {
        for price in prices {
            self.respect_cooldown().await;

            match self
                .managers
                .orders
                .place_order(
                    &self.symbol,
                    side,
                    OrderType::Limit,
                    self.config.order_size,
                    Some(*price),
                    Some(true),
                    false,
                )
                .await
            {
                Ok(_) => {
                    *self.last_order_time.lock() = Some(Instant::now());
                    self.status.write().orders_placed += 1;
                }
                Err(e) => {
                    tracing::warn!(strategy_id = %self.id, ?side, price = %price, error = %e, "order placement failed");
                }
            }
        }
    }

    async fn respect_cooldown(&self) {
        use rust_decimal::prelude::ToPrimitive;

        let cooldown = self.config.order_cooldown_secs;
        let Some(last) = *self.last_order_time.lock() else {
            return;
        };
        let cooldown_ms = (cooldown * Decimal::from(1000)).to_u64().unwrap_or(0);
        let cooldown_duration = Duration::from_millis(cooldown_ms);
        let elapsed = last.elapsed();
        if elapsed < cooldown_duration {
            tokio::time::sleep(cooldown_duration - elapsed).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Depth, OrderStatus, Position, Ticker};
    use rust_decimal_macros::dec;
    use tracing_test::{logs_contain, traced_test};

    struct StubClient;

    #[async_trait::async_trait]
    impl VenueClient for StubClient {
        async fn get_ticker(&self, _symbol: &str) -> Ticker {
            Ticker::zero()
        }
        async fn get_depth(&self, _symbol: &str, _limit: usize) -> Depth {
            Depth::default()
        }
        async fn get_balance(&self, _currency: Option<&str>) -> crate::venue::Balance {
            crate::venue::Balance::default()
        }
        async fn get_position(&self, symbol: &str) -> Result<Position> {
            Ok(Position::flat(symbol))
        }
        async fn place_order(
            &self,
            _symbol: &str,
            _side: OrderSide,
            _order_type: OrderType,
            _quantity: Decimal,
            _limit_price: Option<Decimal>,
            _post_only: bool,
            _reduce_only: bool,
        ) -> Result<crate::domain::Order> {
            unimplemented!()
        }
        async fn cancel_order(&self, _symbol: &str, _order_id: &str) -> Result<crate::domain::Order> {
            unimplemented!()
        }
        async fn get_open_orders(&self, _symbol: Option<&str>, _use_cache: bool) -> Result<Vec<crate::domain::Order>> {
            Ok(vec![])
        }
        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    fn sample_config() -> GridConfig {
        GridConfig {
            order_size: dec!(1),
            total_orders: 18,
            window_percent: dec!(0.12),
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

    fn strategy_with_stub() -> GridStrategy {
        let client: Arc<dyn VenueClient> = Arc::new(StubClient);
        let managers = Arc::new(Managers::new(client.clone()));
        GridStrategy::new(
            "s1".to_string(),
            "acct-1".to_string(),
            "BTC-USD".to_string(),
            sample_config(),
            client,
            managers,
        )
        .unwrap()
    }

    // A cancel target with no matching live order is a stale plan entry,
    // not an error; it must be logged and skipped, never panic the tick.
    #[traced_test]
    #[tokio::test]
    async fn apply_cancels_logs_and_skips_targets_with_no_live_order() {
        let strategy = strategy_with_stub();
        let targets = vec![CancelTarget {
            order_id: None,
            side: OrderSide::Buy,
            price: dec!(100),
        }];

        strategy.apply_cancels(&targets).await;

        assert!(logs_contain("no live order found for cancel target"));
        assert_eq!(strategy.status().orders_cancelled, 0);
    }
}
