mod correlator;
mod pacer;
mod telemetry;

pub mod backend;
pub mod chunks;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod pause;
pub mod snapshot;

pub use backend::{
    AckStream, BackendError, Marker, MarkerKind, OpAck, PING_TRACE_INDEX, PING_TRACE_SERVICE,
    Session, SessionProvider, Trace,
};
pub use chunks::{
    ChunkAssignment, ChunkMap, ChunkSource, chunk_key, count_units, partition_corpus,
    resolve_assignments,
};
pub use config::{CorrelationOrder, LoadOptions};
pub use correlator::SendAckCorrelator;
pub use dispatch::{ActiveSessionGuard, ActiveSessions, ChunkDispatcher, ChunkReport, LoadReport};
pub use driver::{DriverState, EmitState, Emitted, StepOutcome, TypingDriver};
pub use error::{Error, Result};
pub use pacer::Pacer;
pub use pause::PauseToken;
pub use snapshot::{LatencySummary, MetricsEvent, MetricsFn, MetricsSnapshot, PingSummary};
pub use telemetry::SessionTelemetry;
pub use typeload_metrics::{ChartPoint, ChartView};
