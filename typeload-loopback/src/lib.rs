//! In-process stand-in for a collaborative text backend.
//!
//! Every document has a single sequencer that acknowledges operations in submission order after a
//! configurable delay and fans each acknowledgement out to every open session of that document.
//! Documents are kept after their sessions close so their content can be inspected; call
//! [`LoopbackServer::close_document`] to release one and stop its sequencer.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use typeload_core::{ActiveSessions, BackendError, SessionProvider};

mod document;
mod session;

use document::Document;
pub use session::LoopbackSession;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopbackConfig {
    /// Time between an op being submitted and its acknowledgement.
    pub ack_delay: Duration,

    /// When set, every ack carries a ping trace with this value.
    pub ping: Option<Duration>,

    /// Number of `load_session` calls that fail before connections are accepted.
    pub refuse_connections: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LoopbackStats {
    sessions_total: Arc<AtomicU64>,
    ops_total: Arc<AtomicU64>,
    refused_total: Arc<AtomicU64>,
    sessions: Arc<ActiveSessions>,
}

impl LoopbackStats {
    pub fn sessions_total(&self) -> u64 {
        self.sessions_total.load(Ordering::Relaxed)
    }

    pub fn ops_total(&self) -> u64 {
        self.ops_total.load(Ordering::Relaxed)
    }

    pub fn refused_total(&self) -> u64 {
        self.refused_total.load(Ordering::Relaxed)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.active()
    }

    pub fn peak_sessions(&self) -> usize {
        self.sessions.peak()
    }
}

#[derive(Debug, Clone)]
pub struct LoopbackServer {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: LoopbackConfig,
    documents: Mutex<HashMap<String, Arc<Document>>>,
    refuse_remaining: AtomicUsize,
    next_client: AtomicU64,
    stats: LoopbackStats,
}

impl Default for LoopbackServer {
    fn default() -> Self {
        Self::new(LoopbackConfig::default())
    }
}

impl LoopbackServer {
    pub fn new(config: LoopbackConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                refuse_remaining: AtomicUsize::new(config.refuse_connections),
                config,
                documents: Mutex::new(HashMap::new()),
                next_client: AtomicU64::new(1),
                stats: LoopbackStats::default(),
            }),
        }
    }

    pub fn config(&self) -> &LoopbackConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> &LoopbackStats {
        &self.inner.stats
    }

    /// Rendered content of `document_id`, if any session ever opened it.
    pub fn text(&self, document_id: &str) -> Option<String> {
        self.document(document_id).map(|d| d.text())
    }

    pub fn checkpoints(&self, document_id: &str) -> Vec<String> {
        self.document(document_id)
            .map(|d| d.checkpoints())
            .unwrap_or_default()
    }

    /// Number of acknowledgements the document's sequencer has produced.
    pub fn sequenced(&self, document_id: &str) -> u64 {
        self.document(document_id).map_or(0, |d| d.sequenced())
    }

    /// Forgets `document_id`. Its sequencer stops once the last open session is dropped.
    ///
    /// Returns `false` if the document was never opened or is already closed.
    pub fn close_document(&self, document_id: &str) -> bool {
        let closed = self.inner.documents.lock().remove(document_id).is_some();
        if closed {
            tracing::debug!(document = document_id, "loopback document closed");
        }
        closed
    }

    fn document(&self, document_id: &str) -> Option<Arc<Document>> {
        self.inner.documents.lock().get(document_id).cloned()
    }

    fn take_refusal(&self) -> bool {
        self.inner
            .refuse_remaining
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
    }

    fn open(&self, document_id: &str) -> Result<LoopbackSession, BackendError> {
        if self.take_refusal() {
            self.inner.stats.refused_total.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(document = document_id, "loopback refused connection");
            return Err(BackendError::Connection {
                document: document_id.to_string(),
                reason: "connection refused".to_string(),
            });
        }

        let document = self
            .inner
            .documents
            .lock()
            .entry(document_id.to_string())
            .or_insert_with(|| {
                Document::open(
                    document_id,
                    self.inner.config.ack_delay,
                    self.inner.config.ping,
                )
            })
            .clone();

        let n = self.inner.next_client.fetch_add(1, Ordering::Relaxed);
        let client_id: Arc<str> = Arc::from(format!("loopback-{n}"));
        let stats = &self.inner.stats;
        stats.sessions_total.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(document = document_id, client = %client_id, "loopback session opened");
        Ok(LoopbackSession::new(
            client_id,
            document,
            stats.ops_total.clone(),
            stats.sessions.enter(),
        ))
    }
}

impl SessionProvider for LoopbackServer {
    type Session = LoopbackSession;

    async fn load_session(&self, document_id: &str) -> Result<LoopbackSession, BackendError> {
        self.open(document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typeload_core::{MarkerKind, Session};

    async fn session(server: &LoopbackServer) -> LoopbackSession {
        server
            .load_session("doc")
            .await
            .unwrap_or_else(|err| panic!("load_session: {err}"))
    }

    #[tokio::test]
    async fn refuses_the_configured_number_of_connections() {
        let server = LoopbackServer::new(LoopbackConfig {
            refuse_connections: 2,
            ..LoopbackConfig::default()
        });

        for _ in 0..2 {
            assert!(matches!(
                server.load_session("doc").await,
                Err(BackendError::Connection { .. })
            ));
        }
        let _s = session(&server).await;
        assert_eq!(server.stats().refused_total(), 2);
        assert_eq!(server.stats().sessions_total(), 1);
    }

    #[tokio::test]
    async fn sessions_type_before_their_own_anchor() {
        let server = LoopbackServer::default();
        let a = session(&server).await;
        let b = session(&server).await;
        assert_ne!(a.client_id(), b.client_id());
        assert_eq!(a.document_id(), "doc");

        for ch in "hi".chars() {
            let pos = a.resolve_anchor().unwrap_or_else(|err| panic!("{err}"));
            a.insert_text(pos, ch).unwrap_or_else(|err| panic!("{err}"));
        }
        let pos = a.resolve_anchor().unwrap_or_else(|err| panic!("{err}"));
        a.insert_marker(pos, typeload_core::Marker::paragraph("p-0"))
            .unwrap_or_else(|err| panic!("{err}"));
        for ch in "yo".chars() {
            let pos = b.resolve_anchor().unwrap_or_else(|err| panic!("{err}"));
            b.insert_text(pos, ch).unwrap_or_else(|err| panic!("{err}"));
        }

        assert_eq!(server.text("doc").as_deref(), Some("hi\nyo"));
        assert_eq!(server.stats().ops_total(), 5);
        assert_eq!(typeload_core::Marker::paragraph("x").kind, MarkerKind::Paragraph);
    }

    #[tokio::test]
    async fn acks_fan_out_to_every_session() {
        let server = LoopbackServer::default();
        let a = session(&server).await;
        let b = session(&server).await;
        let mut acks_a = a.acks();
        let mut acks_b = b.acks();

        let pos = a.resolve_anchor().unwrap_or_else(|err| panic!("{err}"));
        a.insert_text(pos, 'x').unwrap_or_else(|err| panic!("{err}"));

        for rx in [&mut acks_a, &mut acks_b] {
            let ack = rx.recv().await.unwrap_or_else(|| panic!("closed"));
            assert_eq!(ack.client_id.as_ref(), a.client_id());
            assert_eq!(ack.client_sequence_number, 1);
        }
    }

    #[tokio::test]
    async fn gauge_follows_session_lifetime() {
        let server = LoopbackServer::default();
        let a = session(&server).await;
        let b = session(&server).await;
        assert_eq!(server.stats().active_sessions(), 2);

        drop(a);
        drop(b);
        assert_eq!(server.stats().active_sessions(), 0);
        assert_eq!(server.stats().peak_sessions(), 2);
    }

    #[tokio::test]
    async fn checkpoints_are_recorded_per_document() {
        let server = LoopbackServer::default();
        let a = session(&server).await;
        a.checkpoint("p-0-line-5");

        assert_eq!(server.checkpoints("doc"), vec!["p-0-line-5"]);
        assert!(server.checkpoints("other").is_empty());
        assert_eq!(server.text("other"), None);
    }

    #[tokio::test]
    async fn closing_a_document_stops_its_sequencer() {
        let server = LoopbackServer::default();
        let a = session(&server).await;
        let mut acks = a.acks();
        drop(a);

        assert!(server.close_document("doc"));
        assert!(!server.close_document("doc"));
        assert_eq!(server.text("doc"), None);

        let end = tokio::time::timeout(Duration::from_secs(1), acks.recv())
            .await
            .unwrap_or_else(|_| panic!("sequencer kept running after close"));
        assert!(end.is_none());

        let _fresh = session(&server).await;
        assert_eq!(server.text("doc").as_deref(), Some(""));
    }
}
