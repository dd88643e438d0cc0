//! Adaptive, bounded inter-upload delay.
//!
//! Grounded on `download::retry::RetryPolicy` (bounded exponential backoff,
//! clamping to `max_delay`), cross-validated against `KodrAus-emit/batcher`'s
//! internal `Delay` struct (`step`/`max`, doubling `next()`): both sources
//! converge on the same shape — a scalar bounded by `[min, max]`, adjusted
//! multiplicatively in response to outcomes.

use std::time::Duration;

use rand::Rng;

use crate::config::DelayConfig;

/// Ceiling on the random jitter added to the worker's actual sleep, so
/// devices with synchronized clocks don't retry in lockstep against the
/// ingestion endpoint. Grounded on `download::retry::RetryPolicy`'s own
/// `MAX_JITTER` (500ms), scaled down since this delay's floor can be much
/// shorter than a download retry's.
const MAX_JITTER: Duration = Duration::from_millis(250);

/// Adaptive delay the upload worker consults to schedule its next tick.
///
/// `increase()` is applied on empty reads and retry-worthy failures;
/// `decrease()` is applied on successful deliveries. Both are clamped to
/// `[min, max]` and are monotonic in the direction they move: `increase()`
/// never lowers the value, `decrease()` never raises it.
#[derive(Debug, Clone, Copy)]
pub struct Delay {
    current: Duration,
    min: Duration,
    max: Duration,
    change_rate: f64,
}

impl Delay {
    /// Builds a `Delay` starting at `config.initial`, bounded by
    /// `config.min`/`config.max`.
    #[must_use]
    pub fn new(config: DelayConfig) -> Self {
        Self {
            current: config.initial,
            min: config.min,
            max: config.max,
            change_rate: config.change_rate,
        }
    }

    /// The delay to wait before the next tick.
    #[must_use]
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Multiplies the current delay by `1 + change_rate`, clamped to `max`.
    pub fn increase(&mut self) {
        let scaled = self.current.mul_f64(1.0 + self.change_rate);
        self.current = scaled.min(self.max);
    }

    /// Multiplies the current delay by `1 - change_rate`, clamped to `min`.
    pub fn decrease(&mut self) {
        let factor = (1.0 - self.change_rate).max(0.0);
        let scaled = self.current.mul_f64(factor);
        self.current = scaled.max(self.min);
    }

    /// Raises the floor for the next tick to at least `floor`, without
    /// exceeding `max`. Used to honor a server-supplied `Retry-After` value
    /// that is larger than the current adaptive delay.
    pub fn raise_floor(&mut self, floor: Duration) {
        self.current = self.current.max(floor).min(self.max);
    }

    /// `current()` plus a small random jitter, capped at [`MAX_JITTER`].
    ///
    /// This is what the worker actually sleeps for; `current()` itself
    /// stays deterministic so the monotonicity invariants in `SPEC_FULL.md`
    /// §8 (`increase()` never decreases, `decrease()` never increases) stay
    /// exactly testable without accounting for randomness.
    #[must_use]
    pub fn jittered_current(&self) -> Duration {
        let jitter_ms = rand::thread_rng().gen_range(0..=u64::try_from(MAX_JITTER.as_millis()).unwrap_or(u64::MAX));
        self.current + Duration::from_millis(jitter_ms)
    }
}
