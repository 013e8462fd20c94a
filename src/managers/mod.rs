pub mod account_manager;
pub mod order_manager;
pub mod position_manager;

pub use account_manager::AccountManager;
pub use order_manager::{CancelOutcome, OrderManager};
pub use position_manager::PositionManager;

use std::sync::Arc;

use crate::venue::VenueClient;

/// The per-account manager triplet constructed once by the Instance Pool.
pub struct Managers {
    pub orders: Arc<OrderManager>,
    pub account: Arc<AccountManager>,
    pub position: Arc<PositionManager>,
}

impl Managers {
    pub fn new(client: Arc<dyn VenueClient>) -> Self {
        Self {
            orders: Arc::new(OrderManager::new(client.clone())),
            account: Arc::new(AccountManager::new(client.clone())),
            position: Arc::new(PositionManager::new(client)),
        }
    }
}
