pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("histogram bucket width must be a positive, finite number (got {0})")]
    InvalidBucketWidth(f64),

    #[error("histogram must have at least one bucket")]
    InvalidBucketCount,

    #[error("chart buffer must have at least one slot")]
    InvalidChartLength,

    #[error("failed to create latency distribution: {0}")]
    Distribution(#[from] hdrhistogram::CreationError),
}
