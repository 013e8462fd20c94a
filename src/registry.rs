use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::pool::InstancePool;
use crate::strategy::{GridConfig, GridStrategy, StatusSnapshot, StopReport};

/// In-memory `strategy_id -> instance` map (§4.5). `strategy_id` is an
/// opaque UUID generated at creation; nothing here is persisted, matching
/// the Non-goal that restarting the process loses running strategies.
pub struct StrategyRegistry {
    pool: Arc<InstancePool>,
    instances: Mutex<HashMap<String, Arc<GridStrategy>>>,
}

impl StrategyRegistry {
    pub fn new(pool: Arc<InstancePool>) -> Self {
        Self {
            pool,
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Constructs a strategy against the account's pooled venue client,
    /// starts it, and registers it under a freshly generated id.
    pub async fn create_and_start(
        &self,
        account_key: &str,
        symbol: &str,
        config: GridConfig,
    ) -> Result<String> {
        let managers = self.pool.get_managers(account_key)?;
        let client = self.pool.get_exchange(account_key)?;

        let id = Uuid::new_v4().to_string();
        let strategy = Arc::new(GridStrategy::new(
            id.clone(),
            account_key.to_string(),
            symbol.to_string(),
            config,
            client,
            managers,
        )?);

        strategy.start().await?;
        self.instances.lock().insert(id.clone(), strategy);
        Ok(id)
    }

    pub async fn stop(&self, strategy_id: &str) -> Result<StopReport> {
        let strategy = self.get(strategy_id)?;
        Ok(strategy.stop().await)
    }

    pub async fn restart(&self, strategy_id: &str) -> Result<()> {
        let strategy = self.get(strategy_id)?;
        strategy.restart().await
    }

    /// Forces one reconciliation cycle outside the cadence loop.
    pub async fn tick(&self, strategy_id: &str) -> Result<()> {
        let strategy = self.get(strategy_id)?;
        strategy.tick().await
    }

    pub fn status(&self, strategy_id: &str) -> Result<StatusSnapshot> {
        Ok(self.get(strategy_id)?.status())
    }

    /// Stops the instance first if running, then marks it terminal and
    /// drops it from the map.
    pub async fn delete(&self, strategy_id: &str) -> Result<StopReport> {
        let strategy = self.get(strategy_id)?;
        let report = strategy.delete().await;
        self.instances.lock().remove(strategy_id);
        Ok(report)
    }

    pub fn list_ids(&self) -> Vec<String> {
        self.instances.lock().keys().cloned().collect()
    }

    fn get(&self, strategy_id: &str) -> Result<Arc<GridStrategy>> {
        self.instances
            .lock()
            .get(strategy_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("strategy not found: {strategy_id}")))
    }
}
