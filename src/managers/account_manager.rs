use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::venue::{Balance, VenueClient};

/// Caches the most recent balance per currency. Grounded on
/// `original_source/core/account_manager.py`.
pub struct AccountManager {
    client: Arc<dyn VenueClient>,
    cache: Mutex<HashMap<String, Balance>>,
}

impl AccountManager {
    pub fn new(client: Arc<dyn VenueClient>) -> Self {
        Self {
            client,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_balance(&self, currency: Option<&str>) -> Balance {
        let balance = self.client.get_balance(currency).await;
        if let Some(c) = currency {
            self.cache.lock().insert(c.to_string(), balance);
        }
        balance
    }

    pub fn cached_available(&self, currency: &str) -> Decimal {
        self.cache
            .lock()
            .get(currency)
            .map(|b| b.available)
            .unwrap_or(Decimal::ZERO)
    }

    pub async fn has_sufficient_balance(&self, currency: &str, amount: Decimal) -> bool {
        let balance = self.get_balance(Some(currency)).await;
        balance.available >= amount
    }
}
