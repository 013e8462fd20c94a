pub mod client_trait;
pub mod depth_source;
pub mod executor;
pub mod orders_cache;
pub mod starknet;
pub mod symbol;

pub use client_trait::{Balance, VenueClient};
