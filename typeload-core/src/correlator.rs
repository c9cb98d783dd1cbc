use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::CorrelationOrder;

/// Pairs acknowledgements with the send timestamps of outstanding operations.
#[derive(Debug, Clone)]
pub struct SendAckCorrelator {
    order: CorrelationOrder,
    pending: VecDeque<Instant>,
}

impl SendAckCorrelator {
    pub fn new(order: CorrelationOrder) -> Self {
        Self {
            order,
            pending: VecDeque::new(),
        }
    }

    pub fn record_send(&mut self) {
        self.record_send_at(Instant::now());
    }

    pub fn record_send_at(&mut self, sent: Instant) {
        self.pending.push_back(sent);
    }

    /// Consumes one pending send and returns its round-trip time.
    ///
    /// Returns `None` when nothing is outstanding (e.g. a duplicate ack).
    pub fn resolve_ack(&mut self) -> Option<Duration> {
        self.resolve_ack_at(Instant::now())
    }

    pub fn resolve_ack_at(&mut self, now: Instant) -> Option<Duration> {
        let sent = match self.order {
            CorrelationOrder::Fifo => self.pending.pop_front(),
            CorrelationOrder::Lifo => self.pending.pop_back(),
        }?;
        Some(now.saturating_duration_since(sent))
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}
