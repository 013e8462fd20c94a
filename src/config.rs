use std::time::Duration;

/// Process-level tunables, loaded once at startup. Mirrors the constants
/// named throughout the component design so an operator can override any
/// of them without a rebuild.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Where the account config store JSON file lives.
    pub config_store_path: String,

    /// Cadence between reconciliation ticks for a running strategy.
    pub strategy_tick_interval: Duration,

    /// Deadline for a single venue adapter call (init/ops/cancel all
    /// share one ceiling per the component design).
    pub venue_call_timeout: Duration,

    /// TTL for the adapter's open-orders cache.
    pub adapter_cache_ttl: Duration,

    /// Selects JSON vs pretty tracing output.
    pub production: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let production = std::env::var("APP_ENV").unwrap_or_default() == "production";

        Self {
            config_store_path: std::env::var("CONFIG_STORE_PATH")
                .unwrap_or_else(|_| "config/exchange_config.json".to_string()),
            strategy_tick_interval: Duration::from_millis(env_u64(
                "STRATEGY_TICK_INTERVAL_MS",
                3_000,
            )),
            venue_call_timeout: Duration::from_millis(env_u64("VENUE_CALL_TIMEOUT_MS", 60_000)),
            adapter_cache_ttl: Duration::from_millis(env_u64("ADAPTER_CACHE_TTL_MS", 5_000)),
            production,
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        // SAFETY: tests run single-threaded for env vars is not guaranteed,
        // but these names are namespaced to this crate's own config and no
        // other test in this crate sets them.
        unsafe {
            std::env::remove_var("STRATEGY_TICK_INTERVAL_MS");
            std::env::remove_var("VENUE_CALL_TIMEOUT_MS");
            std::env::remove_var("ADAPTER_CACHE_TTL_MS");
        }
        let cfg = AppConfig::from_env();
        assert_eq!(cfg.strategy_tick_interval, Duration::from_secs(3));
        assert_eq!(cfg.venue_call_timeout, Duration::from_secs(60));
        assert_eq!(cfg.adapter_cache_ttl, Duration::from_secs(5));
    }
}
