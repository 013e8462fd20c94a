use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use grid_engine::config::AppConfig;
use grid_engine::config_store::ConfigStore;
use grid_engine::domain::{Account, Order, OrderSide, OrderType, Position};
use grid_engine::error::Result as EngineResult;
use grid_engine::logger::init_tracing;
use grid_engine::pool::{InstancePool, VenueClientFactory};
use grid_engine::registry::StrategyRegistry;
use grid_engine::strategy::GridConfig;
use grid_engine::venue::starknet::{StarknetPerpClient, StarknetSdk};
use grid_engine::venue::{Balance, VenueClient};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Stand-in for the real signed Starknet perpetual SDK client, which is
/// out of scope here (§1: "the adapter consumes it through the narrow
/// interface"). Wire an authenticated implementation in before running
/// against a live venue; this one only proves the adapter's own plumbing.
struct PlaceholderSdk;

#[async_trait::async_trait]
impl StarknetSdk for PlaceholderSdk {
    async fn fetch_ticker(&self, _symbol: &str) -> anyhow::Result<(Decimal, Decimal, Decimal)> {
        Err(anyhow::anyhow!("PlaceholderSdk: no venue session configured"))
    }
    async fn fetch_depth(
        &self,
        _symbol: &str,
        _limit: usize,
    ) -> anyhow::Result<(Vec<(Decimal, Decimal)>, Vec<(Decimal, Decimal)>)> {
        Err(anyhow::anyhow!("PlaceholderSdk: no venue session configured"))
    }
    async fn fetch_balance(&self, _currency: Option<&str>) -> anyhow::Result<Balance> {
        Ok(Balance::default())
    }
    async fn fetch_position(&self, symbol: &str) -> anyhow::Result<Position> {
        Ok(Position::flat(symbol))
    }
    async fn submit_order(
        &self,
        _symbol: &str,
        _side: OrderSide,
        _order_type: OrderType,
        _quantity: Decimal,
        _limit_price: Option<Decimal>,
        _post_only: bool,
        _reduce_only: bool,
    ) -> anyhow::Result<Order> {
        Err(anyhow::anyhow!("PlaceholderSdk: no venue session configured"))
    }
    async fn cancel(&self, _symbol: &str, _order_id: &str) -> anyhow::Result<Order> {
        Err(anyhow::anyhow!("PlaceholderSdk: no venue session configured"))
    }
    async fn fetch_open_orders(&self, _symbol: Option<&str>) -> anyhow::Result<Vec<Order>> {
        Ok(vec![])
    }
}

struct StarknetPerpFactory {
    call_timeout: Duration,
    cache_ttl: Duration,
}

impl VenueClientFactory for StarknetPerpFactory {
    fn build(&self, account: &Account) -> EngineResult<Arc<dyn VenueClient>> {
        let client = StarknetPerpClient::new(
            PlaceholderSdk,
            "wss://stream.example-starknet-venue.invalid",
            "https://api.example-starknet-venue.invalid",
            self.call_timeout,
            self.cache_ttl,
            account.default_market.clone().unwrap_or_else(|| "USD".to_string()),
        );
        Ok(Arc::new(client))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env();
    init_tracing(cfg.production);

    tracing::info!("starting grid engine");

    let config_store = Arc::new(ConfigStore::new(PathBuf::from(&cfg.config_store_path)));
    config_store.load().await?;

    let factory = Arc::new(StarknetPerpFactory {
        call_timeout: cfg.venue_call_timeout,
        cache_ttl: cfg.adapter_cache_ttl,
    });
    let pool = Arc::new(InstancePool::new(config_store.clone(), factory));
    let registry = Arc::new(StrategyRegistry::new(pool.clone()));

    if let Ok(account_key) = std::env::var("GRID_ACCOUNT_KEY") {
        let symbol = std::env::var("GRID_SYMBOL").unwrap_or_else(|_| "BTC-USD".to_string());
        let order_size: Decimal = std::env::var("GRID_ORDER_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(dec!(0.01));

        let config = GridConfig {
            order_size,
            ..default_grid_config()
        };

        match registry.create_and_start(&account_key, &symbol, config).await {
            Ok(id) => tracing::info!(strategy_id = %id, account_key = %account_key, symbol = %symbol, "strategy started"),
            Err(e) => tracing::error!(error = %e, "failed to start configured strategy"),
        }
    } else {
        tracing::info!("no GRID_ACCOUNT_KEY set; started with zero strategies running");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, closing venue clients");
    pool.clear().await;

    Ok(())
}

fn default_grid_config() -> GridConfig {
    GridConfig {
        order_size: dec!(0.01),
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
