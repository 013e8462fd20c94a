use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config_store::ConfigStore;
use crate::domain::Account;
use crate::error::{Error, Result};
use crate::managers::Managers;
use crate::venue::VenueClient;

/// Builds a concrete venue client for an account. Exists as a seam so the
/// pool never hard-codes which SDK backs a `VenueKind` — mirroring the
/// source's `ExchangeFactory.create` call inside `get_managers`, kept here
/// as an injected collaborator rather than a name-keyed registry so the
/// compiler enforces the match is exhaustive over `VenueKind`.
pub trait VenueClientFactory: Send + Sync {
    fn build(&self, account: &Account) -> Result<Arc<dyn VenueClient>>;
}

struct Entry {
    client: Arc<dyn VenueClient>,
    managers: Arc<Managers>,
}

/// Process-wide, mutex-guarded registry keyed by `account_key`. Guarantees
/// at most one Venue Client per account. Grounded on
/// `original_source/core/exchange_pool.py::ExchangeInstancePool`.
pub struct InstancePool {
    config_store: Arc<ConfigStore>,
    factory: Arc<dyn VenueClientFactory>,
    entries: Mutex<HashMap<String, Arc<Entry>>>,
}

impl InstancePool {
    pub fn new(config_store: Arc<ConfigStore>, factory: Arc<dyn VenueClientFactory>) -> Self {
        Self {
            config_store,
            factory,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the manager triplet for `account_key`, constructing the
    /// adapter and triplet on first access. The lookup-construct sequence
    /// is atomic under a single lock so concurrent first-access never
    /// double-constructs (testable property §8.6).
    pub fn get_managers(&self, account_key: &str) -> Result<Arc<Managers>> {
        Ok(self.get_or_construct(account_key)?.managers)
    }

    /// Returns the adapter, constructing via the same single-lock
    /// lookup-or-construct path as `get_managers` — never re-acquiring the
    /// lock between lookup and use, so a concurrent `remove_account` can't
    /// observe a freshly-constructed entry as absent.
    pub fn get_exchange(&self, account_key: &str) -> Result<Arc<dyn VenueClient>> {
        Ok(self.get_or_construct(account_key)?.client)
    }

    fn get_or_construct(&self, account_key: &str) -> Result<Arc<Entry>> {
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get(account_key) {
            return Ok(entry.clone());
        }

        let account = self
            .config_store
            .get_account_config(account_key)
            .ok_or_else(|| Error::NotFound(format!("account config not found: {account_key}")))?;

        account.validate()?;

        let client = self.factory.build(&account)?;
        let managers = Arc::new(Managers::new(client.clone()));
        let entry = Arc::new(Entry { client, managers });

        entries.insert(account_key.to_string(), entry.clone());

        tracing::info!(account_key = %account_key, "venue client constructed and pooled");
        Ok(entry)
    }

    /// Removes both adapter and triplet; close failures are logged, not
    /// raised. Invariant: after this call the map contains neither for
    /// `account_key`.
    pub async fn remove_account(&self, account_key: &str) -> bool {
        let entry = self.entries.lock().remove(account_key);
        match entry {
            Some(entry) => {
                if let Err(e) = entry.client.close().await {
                    tracing::error!(account_key = %account_key, error = %e, "failed to close venue client");
                }
                true
            }
            None => false,
        }
    }

    /// Orderly shutdown of every entry; used at process exit.
    pub async fn clear(&self) {
        let drained: Vec<(String, Arc<Entry>)> = self.entries.lock().drain().collect();
        for (account_key, entry) in drained {
            if let Err(e) = entry.client.close().await {
                tracing::error!(account_key = %account_key, error = %e, "failed to close venue client during clear");
            }
        }
    }

    pub fn list_accounts(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }
}
