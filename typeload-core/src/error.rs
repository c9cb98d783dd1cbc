use crate::backend::BackendError;
use crate::dispatch::ChunkReport;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("metrics error: {0}")]
    Metrics(#[from] typeload_metrics::Error),

    #[error("chunk partition unavailable: {0}")]
    PartitionLookup(String),

    #[error("ack stream closed for chunk `{chunk}` after {acked}/{units} acknowledgements")]
    AckStreamClosed { chunk: String, acked: u64, units: u64 },

    #[error("driver for chunk `{0}` has no backend session")]
    NotConnected(String),

    /// Every chunk failed; each outcome is kept in assignment order.
    #[error("no chunk completed ({} failed)", chunks.len())]
    NoChunkCompleted { chunks: Vec<ChunkReport> },

    #[error("`concurrency` must be a positive integer")]
    InvalidConcurrency,

    #[error("`checkpoint_every` must be a positive integer")]
    InvalidCheckpointInterval,

    #[error("`snapshot_interval` must be a positive duration")]
    InvalidSnapshotInterval,

    #[error("`document` must not be empty")]
    InvalidDocument,

    #[error("`parts` must be a positive integer")]
    InvalidParts,
}
