use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use typeload_core::{AckStream, ActiveSessionGuard, BackendError, Marker, Session};

use crate::document::{Document, Item};

/// One simulated writer attached to a loopback document.
pub struct LoopbackSession {
    client_id: Arc<str>,
    document: Arc<Document>,
    next_seq: AtomicU64,
    ops: Arc<AtomicU64>,
    _active: ActiveSessionGuard,
}

impl LoopbackSession {
    pub(crate) fn new(
        client_id: Arc<str>,
        document: Arc<Document>,
        ops: Arc<AtomicU64>,
        active: ActiveSessionGuard,
    ) -> Self {
        document.add_anchor(client_id.clone());
        Self {
            client_id,
            document,
            next_seq: AtomicU64::new(1),
            ops,
            _active: active,
        }
    }

    pub fn document_id(&self) -> &str {
        self.document.id()
    }

    fn submit(&self, position: usize, item: Item) -> Result<(), BackendError> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.document.insert(position, item, &self.client_id, seq)?;
        self.ops.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl Session for LoopbackSession {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn acks(&self) -> AckStream {
        self.document.subscribe()
    }

    fn resolve_anchor(&self) -> Result<usize, BackendError> {
        self.document.anchor_of(&self.client_id)
    }

    fn insert_text(&self, position: usize, ch: char) -> Result<(), BackendError> {
        self.submit(position, Item::Char(ch))
    }

    fn insert_marker(&self, position: usize, marker: Marker) -> Result<(), BackendError> {
        self.submit(position, Item::Marker(marker.kind))
    }

    fn checkpoint(&self, label: &str) {
        tracing::trace!(document = self.document.id(), label, "checkpoint");
        self.document.checkpoint(label);
    }
}

impl Drop for LoopbackSession {
    fn drop(&mut self) {
        tracing::debug!(
            document = self.document.id(),
            client = %self.client_id,
            "loopback session closed"
        );
    }
}
