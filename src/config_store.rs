use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::domain::Account;
use crate::error::Result;

/// On-disk shape. A top-level map keyed by `account_key`, matching the
/// source's JSON config file layout. A bare single-record object (the
/// source's oldest on-disk layout, observed before the venue-keyed map was
/// introduced) is migrated in place on load.
#[derive(Default, Serialize, Deserialize)]
struct FileLayout {
    accounts: HashMap<String, Account>,
}

/// File-backed JSON store mapping `account_key -> Account`. Writes replace
/// the whole file (no partial-record updates); reads hold an in-memory
/// mirror refreshed on every mutation, matching the single-writer-thread
/// assumption the source's config manager made explicit in its docstring.
pub struct ConfigStore {
    path: PathBuf,
    state: Mutex<HashMap<String, Account>>,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Loads the on-disk file if present, migrating the legacy
    /// single-record layout (`{"account_key": ..., ...}` with no wrapping
    /// `accounts` map) into the current layout. Missing file is not an
    /// error; it means a fresh install with zero configured accounts.
    pub async fn load(&self) -> Result<()> {
        let bytes = match fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no config store file found, starting empty");
                return Ok(());
            }
            Err(e) => {
                return Err(crate::error::Error::Configuration {
                    field: "config_store_path".to_string(),
                    message: e.to_string(),
                });
            }
        };

        let parse_err = |e: serde_json::Error| crate::error::Error::Configuration {
            field: "config_store_path".to_string(),
            message: format!("malformed config file: {e}"),
        };

        let accounts = if let Ok(layout) = serde_json::from_slice::<FileLayout>(&bytes) {
            layout.accounts
        } else {
            let legacy: Account = serde_json::from_slice(&bytes).map_err(parse_err)?;
            tracing::warn!(
                account_key = %legacy.account_key,
                "migrating legacy single-record config file layout"
            );
            let mut map = HashMap::new();
            map.insert(legacy.account_key.clone(), legacy);
            map
        };

        *self.state.lock() = accounts;
        Ok(())
    }

    pub fn get_account_config(&self, account_key: &str) -> Option<Account> {
        self.state.lock().get(account_key).cloned()
    }

    pub fn list_account_keys(&self) -> Vec<String> {
        self.state.lock().keys().cloned().collect()
    }

    /// Inserts or replaces a record, auto-synthesizing `account_key` and
    /// `account_alias` from `venue_tag` when the caller leaves either
    /// empty. `account_key` collisions are resolved by suffixing the
    /// smallest `_<n>` (n >= 1) not already present, matching §4.6.
    pub async fn save_exchange_config(&self, venue_tag: &str, mut account: Account) -> Result<()> {
        {
            let mut guard = self.state.lock();

            if account.account_key.is_empty() {
                account.account_key = if !guard.contains_key(venue_tag) {
                    venue_tag.to_string()
                } else {
                    let mut n = 1;
                    loop {
                        let candidate = format!("{venue_tag}_{n}");
                        if !guard.contains_key(&candidate) {
                            break candidate;
                        }
                        n += 1;
                    }
                };
            }
            if account.account_alias.is_empty() {
                account.account_alias = format!("{} account", capitalize(venue_tag));
            }

            guard.insert(account.account_key.clone(), account);
        }
        self.flush().await
    }

    pub async fn remove_account(&self, account_key: &str) -> Result<bool> {
        let removed = {
            let mut guard = self.state.lock();
            guard.remove(account_key).is_some()
        };
        if removed {
            self.flush().await?;
        }
        Ok(removed)
    }

    async fn flush(&self) -> Result<()> {
        let layout = FileLayout {
            accounts: self.state.lock().clone(),
        };
        let serialized = serde_json::to_vec_pretty(&layout).map_err(|e| {
            crate::error::Error::Configuration {
                field: "config_store_path".to_string(),
                message: e.to_string(),
            }
        })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                crate::error::Error::Configuration {
                    field: "config_store_path".to_string(),
                    message: e.to_string(),
                }
            })?;
        }

        fs::write(&self.path, serialized)
            .await
            .map_err(|e| crate::error::Error::Configuration {
                field: "config_store_path".to_string(),
                message: e.to_string(),
            })
    }
}

/// First character upper, rest lower — matches Python's `str.capitalize()`,
/// which the source applies to the venue tag before the `" account"` suffix.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VenueKind;

    fn mk_account(key: &str) -> Account {
        Account {
            account_key: key.to_string(),
            name: VenueKind::StarknetPerp,
            account_alias: String::new(),
            api_key: "k".to_string(),
            secret_key: "s".to_string(),
            testnet: true,
            vault: Some(1),
            public_key: Some("pk".to_string()),
            private_key: Some("sk".to_string()),
            default_market: None,
        }
    }

    fn tmp_path() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("grid-engine-config-{}.json", uuid::Uuid::new_v4()));
        p
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let path = tmp_path();
        let store = ConfigStore::new(path.clone());
        store
            .save_exchange_config("starknetperp", mk_account(""))
            .await
            .unwrap();

        let reloaded = ConfigStore::new(path.clone());
        reloaded.load().await.unwrap();
        assert_eq!(reloaded.list_account_keys(), vec!["starknetperp".to_string()]);

        let account = reloaded.get_account_config("starknetperp").unwrap();
        assert_eq!(account.account_alias, "Starknetperp account");

        let _ = fs::remove_file(path).await;
    }

    #[tokio::test]
    async fn load_migrates_legacy_single_record_layout() {
        let path = tmp_path();
        let legacy = mk_account("legacy-key");
        fs::write(&path, serde_json::to_vec(&legacy).unwrap())
            .await
            .unwrap();

        let store = ConfigStore::new(path.clone());
        store.load().await.unwrap();
        assert_eq!(store.list_account_keys(), vec!["legacy-key".to_string()]);

        let _ = fs::remove_file(path).await;
    }

    #[tokio::test]
    async fn missing_file_loads_as_empty_without_error() {
        let store = ConfigStore::new(tmp_path());
        store.load().await.unwrap();
        assert!(store.list_account_keys().is_empty());
    }

    #[tokio::test]
    async fn remove_account_returns_false_when_absent() {
        let store = ConfigStore::new(tmp_path());
        assert!(!store.remove_account("nope").await.unwrap());
    }

    #[test]
    fn capitalize_upper_first_lower_rest() {
        assert_eq!(capitalize("starknetperp"), "Starknetperp");
        assert_eq!(capitalize("STARKNETPERP"), "Starknetperp");
        assert_eq!(capitalize(""), "");
    }
}
