pub mod client;
pub mod rest;
pub mod sdk;
pub mod ws;

pub use client::StarknetPerpClient;
pub use sdk::StarknetSdk;
