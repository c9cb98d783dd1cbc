use hdrhistogram::Histogram;

use crate::error::Result;

// Upper bound: 1 hour in microseconds.
const MAX_TRACKABLE_US: u64 = 3_600_000_000;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PercentileSummary {
    pub p50: Option<f64>,
    pub p90: Option<f64>,
    pub p99: Option<f64>,
}

/// Bounded-memory latency distribution used for percentile reporting.
///
/// Samples are recorded in microseconds and reported back in milliseconds.
#[derive(Debug, Clone)]
pub struct LatencyDistribution {
    inner: Histogram<u64>,
}

impl LatencyDistribution {
    pub fn new() -> Result<Self> {
        let inner = Histogram::<u64>::new_with_bounds(1, MAX_TRACKABLE_US, 3)?;
        Ok(Self { inner })
    }

    pub fn record_ms(&mut self, value_ms: f64) {
        if !value_ms.is_finite() {
            return;
        }
        let us = (value_ms.max(0.0) * 1000.0).round() as u64;
        self.inner.saturating_record(us.max(1));
    }

    pub fn len(&self) -> u64 {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn summary(&self) -> PercentileSummary {
        let count = self.inner.len();
        let at = |q| self.inner.value_at_quantile(q) as f64 / 1000.0;

        PercentileSummary {
            p50: (count > 0).then(|| at(0.50)),
            p90: (count > 0).then(|| at(0.90)),
            p99: (count > 0).then(|| at(0.99)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist() -> LatencyDistribution {
        LatencyDistribution::new().unwrap_or_else(|err| panic!("failed to create dist: {err}"))
    }

    #[test]
    fn empty_distribution_has_no_percentiles() {
        let d = dist();
        assert!(d.is_empty());
        assert_eq!(d.summary(), PercentileSummary::default());
    }

    #[test]
    fn percentiles_track_recorded_values() {
        let mut d = dist();
        for ms in 1..=100u32 {
            d.record_ms(f64::from(ms));
        }

        let s = d.summary();
        assert_eq!(d.len(), 100);
        let p50 = s.p50.unwrap_or_else(|| panic!("expected p50"));
        let p99 = s.p99.unwrap_or_else(|| panic!("expected p99"));
        assert!((p50 - 50.0).abs() < 0.5, "p50={p50}");
        assert!((p99 - 99.0).abs() < 0.5, "p99={p99}");
    }

    #[test]
    fn non_finite_samples_are_ignored() {
        let mut d = dist();
        d.record_ms(f64::NAN);
        d.record_ms(f64::INFINITY);
        assert!(d.is_empty());
    }
}
