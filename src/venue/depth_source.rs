use std::time::{Duration, Instant};

use rust_decimal::Decimal;

/// The depth source's lifecycle for one symbol, modeled explicitly per the
/// redesign note: transitions are driven solely by the age counter and the
/// empty counter, never interleaved with REST-fallback branching.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepthSourceState {
    Uninitialized,
    StreamingFresh,
    StreamingStale,
    Disabled,
}

const STALE_AFTER: Duration = Duration::from_secs(30);
const EMPTY_RECREATE_THRESHOLD: u32 = 20;

/// Per-symbol bookkeeping for the hybrid depth source: last observed best
/// bid/ask, when they last changed, and a run of consecutive empty reads.
pub struct DepthTracker {
    last_bid: Option<Decimal>,
    last_ask: Option<Decimal>,
    last_change_at: Instant,
    empty_count: u32,
    state: DepthSourceState,
}

impl DepthTracker {
    pub fn new() -> Self {
        Self {
            last_bid: None,
            last_ask: None,
            last_change_at: Instant::now(),
            empty_count: 0,
            state: DepthSourceState::Uninitialized,
        }
    }

    pub fn state(&self) -> DepthSourceState {
        self.state
    }

    /// Records a quote observed from the stream. Returns the updated
    /// state after evaluating staleness against `now`.
    pub fn observe(&mut self, bid: Option<Decimal>, ask: Option<Decimal>, now: Instant) -> DepthSourceState {
        match (bid, ask) {
            (Some(b), Some(a)) => {
                self.empty_count = 0;
                let unchanged = self.last_bid == Some(b) && self.last_ask == Some(a);
                if !unchanged || self.state == DepthSourceState::Uninitialized {
                    self.last_bid = Some(b);
                    self.last_ask = Some(a);
                    self.last_change_at = now;
                }

                if now.duration_since(self.last_change_at) > STALE_AFTER {
                    self.state = DepthSourceState::StreamingStale;
                } else {
                    self.state = DepthSourceState::StreamingFresh;
                }
            }
            _ => {
                self.empty_count += 1;
                if self.empty_count >= EMPTY_RECREATE_THRESHOLD {
                    self.state = DepthSourceState::Disabled;
                }
            }
        }
        self.state
    }

    /// Called after the subscription has been torn down and a fresh one
    /// created; resets all bookkeeping to `Uninitialized`.
    pub fn reset(&mut self) {
        self.last_bid = None;
        self.last_ask = None;
        self.empty_count = 0;
        self.state = DepthSourceState::Uninitialized;
        self.last_change_at = Instant::now();
    }
}

impl Default for DepthTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn becomes_fresh_on_first_quote() {
        let mut t = DepthTracker::new();
        let now = Instant::now();
        assert_eq!(
            t.observe(Some(dec!(100)), Some(dec!(101)), now),
            DepthSourceState::StreamingFresh
        );
    }

    #[test]
    fn stays_fresh_just_under_30_seconds_unchanged() {
        let mut t = DepthTracker::new();
        let t0 = Instant::now();
        t.observe(Some(dec!(100)), Some(dec!(101)), t0);
        let almost = t0 + Duration::from_millis(29_999);
        assert_eq!(
            t.observe(Some(dec!(100)), Some(dec!(101)), almost),
            DepthSourceState::StreamingFresh
        );
    }

    #[test]
    fn goes_stale_just_over_30_seconds_unchanged() {
        let mut t = DepthTracker::new();
        let t0 = Instant::now();
        t.observe(Some(dec!(100)), Some(dec!(101)), t0);
        let later = t0 + Duration::from_millis(30_001);
        assert_eq!(
            t.observe(Some(dec!(100)), Some(dec!(101)), later),
            DepthSourceState::StreamingStale
        );
    }

    #[test]
    fn price_change_resets_the_staleness_clock() {
        let mut t = DepthTracker::new();
        let t0 = Instant::now();
        t.observe(Some(dec!(100)), Some(dec!(101)), t0);
        let mid = t0 + Duration::from_secs(20);
        t.observe(Some(dec!(102)), Some(dec!(103)), mid);
        let later = mid + Duration::from_secs(20);
        // 40s since t0, but only 20s since the price actually changed.
        assert_eq!(
            t.observe(Some(dec!(102)), Some(dec!(103)), later),
            DepthSourceState::StreamingFresh
        );
    }

    #[test]
    fn disables_after_20_consecutive_empty_reads() {
        let mut t = DepthTracker::new();
        let now = Instant::now();
        for _ in 0..19 {
            let s = t.observe(None, None, now);
            assert_ne!(s, DepthSourceState::Disabled);
        }
        assert_eq!(t.observe(None, None, now), DepthSourceState::Disabled);
    }

    #[test]
    fn reset_returns_to_uninitialized() {
        let mut t = DepthTracker::new();
        let now = Instant::now();
        t.observe(Some(dec!(100)), Some(dec!(101)), now);
        t.reset();
        assert_eq!(t.state(), DepthSourceState::Uninitialized);
    }
}
