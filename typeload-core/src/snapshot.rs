use std::sync::Arc;
use std::time::Duration;

use typeload_metrics::ChartView;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencySummary {
    pub samples: u64,
    pub mean_ms: f64,
    pub stdev_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p50_ms: Option<f64>,
    pub p90_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

impl LatencySummary {
    pub fn is_defined(&self) -> bool {
        self.samples > 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PingSummary {
    pub samples: u64,
    pub mean_ms: f64,
    pub max_ms: f64,
}

/// Point-in-time view of one writer session. Every consumer gets its own copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub chunk: String,
    pub elapsed: Duration,

    pub latency: LatencySummary,
    pub latency_histogram: Vec<u64>,
    pub histogram_bucket_ms: f64,

    /// Acknowledgements per second since emission started.
    pub ack_rate: f64,
    /// Emitted units per second since emission started.
    pub typing_rate: f64,

    pub typed: u64,
    pub acked: u64,
    /// `typed / corpus_len` in `0..=1`.
    pub typing_progress: f64,
    /// `acked / corpus_len` in `0..=1`.
    pub ack_progress: f64,

    /// `None` until the backend reports a ping trace.
    pub ping: Option<PingSummary>,

    /// Number of units (characters and paragraph markers) in the chunk.
    pub corpus_len: u64,
    pub pacing_interval: Duration,
}

#[derive(Debug, Clone)]
pub enum MetricsEvent {
    /// Emitted for every acknowledgement that resolved a round trip.
    Ack(MetricsSnapshot),

    /// Emitted by the periodic snapshot loop.
    Tick {
        tick: u64,
        snapshot: MetricsSnapshot,
        chart: ChartView,
    },
}

impl MetricsEvent {
    pub fn snapshot(&self) -> &MetricsSnapshot {
        match self {
            Self::Ack(s) | Self::Tick { snapshot: s, .. } => s,
        }
    }
}

pub type MetricsFn = Arc<dyn Fn(MetricsEvent) + Send + Sync + 'static>;

pub(crate) fn progress_ratio(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (done as f64 / total as f64).clamp(0.0, 1.0)
}
