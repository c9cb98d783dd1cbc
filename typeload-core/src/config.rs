use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_CHECKPOINT_EVERY: u64 = 5;
pub const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_HISTOGRAM_BUCKET_MS: f64 = 10.0;
pub const DEFAULT_HISTOGRAM_BUCKETS: usize = 50;
pub const DEFAULT_CHART_LEN: usize = 60;

/// Which pending send an incoming acknowledgement resolves.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::EnumString, strum::Display,
)]
pub enum CorrelationOrder {
    /// Oldest pending send first. Correct for in-order transports.
    #[default]
    #[strum(serialize = "fifo")]
    Fifo,

    /// Most recent pending send first. Only meaningful if acks can overtake each other; kept to
    /// reproduce legacy measurements, it skews per-operation latency on ordered channels.
    #[strum(serialize = "lifo")]
    Lifo,
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub document: String,

    /// Delay between two emitted units. Zero means "as fast as the scheduler allows".
    pub pacing_interval: Duration,

    /// Maximum number of concurrently active writer sessions.
    pub concurrency: usize,

    /// Request a checkpoint every N paragraph markers.
    pub checkpoint_every: u64,

    pub snapshot_interval: Duration,
    pub correlation: CorrelationOrder,

    pub histogram_bucket_ms: f64,
    pub histogram_buckets: usize,
    pub chart_len: usize,
}

impl LoadOptions {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            pacing_interval: Duration::ZERO,
            concurrency: 1,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
            correlation: CorrelationOrder::default(),
            histogram_bucket_ms: DEFAULT_HISTOGRAM_BUCKET_MS,
            histogram_buckets: DEFAULT_HISTOGRAM_BUCKETS,
            chart_len: DEFAULT_CHART_LEN,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.document.trim().is_empty() {
            return Err(Error::InvalidDocument);
        }
        if self.concurrency == 0 {
            return Err(Error::InvalidConcurrency);
        }
        if self.checkpoint_every == 0 {
            return Err(Error::InvalidCheckpointInterval);
        }
        if self.snapshot_interval.is_zero() {
            return Err(Error::InvalidSnapshotInterval);
        }

        // Surface histogram/chart shape errors before any session starts.
        typeload_metrics::BucketHistogram::new(self.histogram_bucket_ms, self.histogram_buckets)?;
        typeload_metrics::ChartBuffer::new(self.chart_len)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let opts = LoadOptions::new("doc");
        assert!(opts.validate().is_ok());
        assert_eq!(opts.checkpoint_every, 5);
        assert_eq!(opts.correlation, CorrelationOrder::Fifo);
    }

    #[test]
    fn validate_rejects_invalid_values() {
        let mut opts = LoadOptions::new("doc");
        opts.concurrency = 0;
        assert!(matches!(opts.validate(), Err(Error::InvalidConcurrency)));

        let mut opts = LoadOptions::new("doc");
        opts.checkpoint_every = 0;
        assert!(matches!(
            opts.validate(),
            Err(Error::InvalidCheckpointInterval)
        ));

        let mut opts = LoadOptions::new("doc");
        opts.snapshot_interval = Duration::ZERO;
        assert!(matches!(
            opts.validate(),
            Err(Error::InvalidSnapshotInterval)
        ));

        let mut opts = LoadOptions::new("doc");
        opts.histogram_buckets = 0;
        assert!(matches!(opts.validate(), Err(Error::Metrics(_))));

        assert!(matches!(
            LoadOptions::new("  ").validate(),
            Err(Error::InvalidDocument)
        ));
    }

    #[test]
    fn correlation_order_parses_from_strings() {
        assert_eq!("fifo".parse::<CorrelationOrder>().ok(), Some(CorrelationOrder::Fifo));
        assert_eq!("lifo".parse::<CorrelationOrder>().ok(), Some(CorrelationOrder::Lifo));
        assert!("random".parse::<CorrelationOrder>().is_err());
        assert_eq!(CorrelationOrder::Lifo.to_string(), "lifo");
    }
}
