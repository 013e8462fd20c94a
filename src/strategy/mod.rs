pub mod config;
pub mod engine;
pub mod ladder;

pub use config::GridConfig;
pub use engine::{GridStrategy, StatusSnapshot, StopReport, StrategyState};
