use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::Position;
use crate::error::Error;
use crate::venue::VenueClient;

/// Queries the venue and caches the result; on any query error whose
/// message identifies a timeout, suppresses the log (to avoid spamming a
/// stalled cadence thread) and falls back to the last known position, or
/// an empty position if none was ever cached. Grounded on
/// `original_source/core/position_manager.py`.
pub struct PositionManager {
    client: Arc<dyn VenueClient>,
    cache: Mutex<HashMap<String, Position>>,
}

impl PositionManager {
    pub fn new(client: Arc<dyn VenueClient>) -> Self {
        Self {
            client,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_position(&self, symbol: &str) -> Position {
        match self.client.get_position(symbol).await {
            Ok(position) => {
                self.cache
                    .lock()
                    .insert(symbol.to_string(), position.clone());
                position
            }
            Err(e) => {
                if !Error::is_timeout_message(&e.to_string()) {
                    tracing::warn!(symbol = %symbol, error = %e, "get_position failed");
                }
                self.cache
                    .lock()
                    .get(symbol)
                    .cloned()
                    .unwrap_or_else(|| Position::flat(symbol))
            }
        }
    }
}
