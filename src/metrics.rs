use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-venue-client operational counters. Tick/placement/cancel counts
/// already live on each strategy's own status snapshot, so this only
/// tracks what no other reader surfaces: cache effectiveness, executor
/// timeouts, and forced depth-stream recreates.
#[derive(Clone, Default)]
pub struct Counters {
    pub cache_hits: Arc<AtomicU64>,
    pub cache_misses: Arc<AtomicU64>,
    pub venue_timeouts: Arc<AtomicU64>,
    pub depth_stream_recreates: Arc<AtomicU64>,
}

impl Counters {
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
