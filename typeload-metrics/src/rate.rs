use std::time::Duration;

use tokio::time::Instant;

/// Accumulating counter normalized by the time since its last reset.
///
/// Rates are reported per millisecond by [`RateCounter::rate`]; callers pick the reporting unit
/// (see [`RateCounter::rate_per_sec`]).
#[derive(Debug, Clone, Copy)]
pub struct RateCounter {
    total: f64,
    samples: u64,
    min: f64,
    max: f64,
    window_start: Instant,
}

impl Default for RateCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateCounter {
    pub fn new() -> Self {
        Self {
            total: 0.0,
            samples: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            window_start: Instant::now(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn increment(&mut self, amount: f64) {
        self.total += amount;
        self.samples = self.samples.saturating_add(1);
        if amount < self.min {
            self.min = amount;
        }
        if amount > self.max {
            self.max = amount;
        }
    }

    pub fn elapsed(&self) -> Duration {
        Instant::now().saturating_duration_since(self.window_start)
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn min(&self) -> Option<f64> {
        (self.samples > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.samples > 0).then_some(self.max)
    }

    pub fn mean(&self) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        self.total / self.samples as f64
    }

    /// Accumulated value per elapsed millisecond; `0.0` while no time has passed.
    pub fn rate(&self) -> f64 {
        let elapsed_ms = self.elapsed().as_secs_f64() * 1000.0;
        if elapsed_ms <= 0.0 {
            return 0.0;
        }
        self.total / elapsed_ms
    }

    pub fn rate_per_sec(&self) -> f64 {
        self.rate() * 1000.0
    }
}
