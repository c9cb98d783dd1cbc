//! Boundary to the collaborative text backend.
//!
//! The engine only needs a narrow slice of a real backend: acquire a session for a document,
//! insert characters and markers relative to the session's anchor marker, request checkpoints,
//! and observe the stream of sequenced operation acknowledgements.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

/// Trace slot that carries the ping measurement on an acknowledgement.
pub const PING_TRACE_INDEX: usize = 7;
pub const PING_TRACE_SERVICE: &str = "ping";

pub type AckStream = mpsc::UnboundedReceiver<OpAck>;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to connect to document `{document}`: {reason}")]
    Connection { document: String, reason: String },

    #[error("anchor marker is no longer present in the document")]
    AnchorLost,

    #[error("position {position} is out of bounds (document length {len})")]
    OutOfBounds { position: usize, len: usize },

    #[error("session closed")]
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub service: String,
    pub action: String,
    pub timestamp_ms: f64,
}

/// Backend confirmation that an operation was sequenced.
#[derive(Debug, Clone, PartialEq)]
pub struct OpAck {
    pub client_sequence_number: u64,
    pub client_id: Arc<str>,
    pub traces: Vec<Trace>,
}

impl OpAck {
    /// Ping measurement in milliseconds, if the ack carries a well-formed ping trace.
    pub fn ping_ms(&self) -> Option<f64> {
        let trace = self.traces.get(PING_TRACE_INDEX)?;
        if trace.service != PING_TRACE_SERVICE {
            return None;
        }

        let v = trace.timestamp_ms;
        (v.is_finite() && v >= 0.0).then_some(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum MarkerKind {
    Paragraph,
    Anchor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub kind: MarkerKind,
    pub attributes: Vec<(String, String)>,
}

impl Marker {
    pub fn paragraph(chunk: &str) -> Self {
        Self {
            kind: MarkerKind::Paragraph,
            attributes: vec![("chunk".to_string(), chunk.to_string())],
        }
    }
}

/// One writer connection to a shared document.
///
/// Every successful `insert_*` call is one operation and is eventually acknowledged exactly once
/// on every ack stream of the document.
pub trait Session: Send + Sync + 'static {
    fn client_id(&self) -> &str;

    /// Subscribe to acknowledgements for the whole document (including other clients' ops).
    fn acks(&self) -> AckStream;

    /// Current position of this session's anchor marker.
    fn resolve_anchor(&self) -> Result<usize, BackendError>;

    fn insert_text(&self, position: usize, ch: char) -> Result<(), BackendError>;

    fn insert_marker(&self, position: usize, marker: Marker) -> Result<(), BackendError>;

    /// Best-effort named save. Must not block.
    fn checkpoint(&self, label: &str);
}

pub trait SessionProvider: Send + Sync + 'static {
    type Session: Session;

    fn load_session(
        &self,
        document_id: &str,
    ) -> impl Future<Output = Result<Self::Session, BackendError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ack_with_traces(traces: Vec<Trace>) -> OpAck {
        OpAck {
            client_sequence_number: 1,
            client_id: Arc::from("client-1"),
            traces,
        }
    }

    fn trace(service: &str, timestamp_ms: f64) -> Trace {
        Trace {
            service: service.to_string(),
            action: "end".to_string(),
            timestamp_ms,
        }
    }

    #[test]
    fn ping_is_read_from_fixed_trace_slot() {
        let mut traces: Vec<Trace> = (0..PING_TRACE_INDEX).map(|_| trace("gateway", 1.0)).collect();
        traces.push(trace(PING_TRACE_SERVICE, 12.5));

        assert_eq!(ack_with_traces(traces).ping_ms(), Some(12.5));
    }

    #[test]
    fn missing_or_malformed_ping_is_tolerated() {
        assert_eq!(ack_with_traces(vec![]).ping_ms(), None);

        let mut wrong_service: Vec<Trace> = (0..=PING_TRACE_INDEX).map(|_| trace("x", 1.0)).collect();
        assert_eq!(ack_with_traces(wrong_service.clone()).ping_ms(), None);

        wrong_service[PING_TRACE_INDEX] = trace(PING_TRACE_SERVICE, f64::NAN);
        assert_eq!(ack_with_traces(wrong_service.clone()).ping_ms(), None);

        wrong_service[PING_TRACE_INDEX] = trace(PING_TRACE_SERVICE, -4.0);
        assert_eq!(ack_with_traces(wrong_service).ping_ms(), None);
    }

    #[test]
    fn marker_kind_round_trips_through_strings() {
        assert_eq!(MarkerKind::Paragraph.to_string(), "paragraph");
        assert_eq!("anchor".parse::<MarkerKind>().ok(), Some(MarkerKind::Anchor));
    }
}
