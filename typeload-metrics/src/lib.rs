pub mod chart;
pub mod distribution;
pub mod error;
pub mod histogram;
pub mod rate;
pub mod running;

pub use chart::{ChartBuffer, ChartPoint, ChartView};
pub use distribution::{LatencyDistribution, PercentileSummary};
pub use error::{Error, Result};
pub use histogram::BucketHistogram;
pub use rate::RateCounter;
pub use running::{LatencyEstimate, RunningLatency, RunningStats};
