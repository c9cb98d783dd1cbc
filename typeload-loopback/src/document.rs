use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use typeload_core::{BackendError, MarkerKind, OpAck, PING_TRACE_SERVICE, Trace};

/// Hops an op passes through before the ping slot; the ping trace lands right after them.
const HOPS: [(&str, &str); 7] = [
    ("client", "submit"),
    ("gateway", "receive"),
    ("sequencer", "start"),
    ("sequencer", "end"),
    ("storage", "write"),
    ("broadcast", "start"),
    ("gateway", "send"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Item {
    Char(char),
    Marker(MarkerKind),
}

/// Items in front of one session's anchor marker.
#[derive(Debug)]
struct Segment {
    items: Vec<Item>,
    anchor: Arc<str>,
}

/// Document content split at session anchors, followed by an anchorless tail.
///
/// Positions count every item plus one slot per anchor. Typing at an anchor appends to the end of
/// its segment, so an insert costs O(sessions) instead of O(document length).
#[derive(Debug, Default)]
struct Layout {
    segments: Vec<Segment>,
    tail: Vec<Item>,
}

impl Layout {
    fn add_anchor(&mut self, owner: Arc<str>) {
        let items = std::mem::take(&mut self.tail);
        self.segments.push(Segment {
            items,
            anchor: owner,
        });
    }

    fn anchor_of(&self, owner: &str) -> Option<usize> {
        let mut base = 0;
        for seg in &self.segments {
            base += seg.items.len();
            if seg.anchor.as_ref() == owner {
                return Some(base);
            }
            base += 1;
        }
        None
    }

    /// Inserts `item` so it ends up at `position`; on failure returns the current length.
    fn insert(&mut self, position: usize, item: Item) -> Result<(), usize> {
        let mut base = 0;
        for seg in &mut self.segments {
            let end = base + seg.items.len();
            if position <= end {
                seg.items.insert(position - base, item);
                return Ok(());
            }
            base = end + 1;
        }

        let end = base + self.tail.len();
        if position > end {
            return Err(end);
        }
        self.tail.insert(position - base, item);
        Ok(())
    }

    fn items(&self) -> impl Iterator<Item = &Item> {
        self.segments
            .iter()
            .flat_map(|seg| seg.items.iter())
            .chain(self.tail.iter())
    }
}

#[derive(Debug)]
struct Submitted {
    client_id: Arc<str>,
    client_sequence_number: u64,
    at: Instant,
}

/// Shared state of one simulated document.
#[derive(Debug)]
pub(crate) struct Document {
    id: String,
    layout: Mutex<Layout>,
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<OpAck>>>>,
    checkpoints: Mutex<Vec<String>>,
    sequencer: mpsc::UnboundedSender<Submitted>,
    sequenced: Arc<AtomicU64>,
}

impl Document {
    /// Creates the document and starts its sequencer. Must be called inside a tokio runtime.
    pub(crate) fn open(id: &str, ack_delay: Duration, ping: Option<Duration>) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscribers = Arc::new(Mutex::new(Vec::new()));
        let sequenced = Arc::new(AtomicU64::new(0));

        tokio::spawn(sequence(
            rx,
            subscribers.clone(),
            sequenced.clone(),
            ack_delay,
            ping,
        ));
        tracing::debug!(document = id, "loopback document opened");

        Arc::new(Self {
            id: id.to_string(),
            layout: Mutex::new(Layout::default()),
            subscribers,
            checkpoints: Mutex::new(Vec::new()),
            sequencer: tx,
            sequenced,
        })
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn subscribe(&self) -> mpsc::UnboundedReceiver<OpAck> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Appends `owner`'s anchor marker at the end of the document.
    pub(crate) fn add_anchor(&self, owner: Arc<str>) {
        self.layout.lock().add_anchor(owner);
    }

    pub(crate) fn anchor_of(&self, owner: &str) -> Result<usize, BackendError> {
        self.layout
            .lock()
            .anchor_of(owner)
            .ok_or(BackendError::AnchorLost)
    }

    /// Inserts `item` and queues its acknowledgement.
    pub(crate) fn insert(
        &self,
        position: usize,
        item: Item,
        client_id: &Arc<str>,
        client_sequence_number: u64,
    ) -> Result<(), BackendError> {
        self.layout
            .lock()
            .insert(position, item)
            .map_err(|len| BackendError::OutOfBounds { position, len })?;

        self.sequencer
            .send(Submitted {
                client_id: client_id.clone(),
                client_sequence_number,
                at: Instant::now(),
            })
            .map_err(|_| BackendError::Closed)
    }

    pub(crate) fn checkpoint(&self, label: &str) {
        self.checkpoints.lock().push(label.to_string());
    }

    pub(crate) fn checkpoints(&self) -> Vec<String> {
        self.checkpoints.lock().clone()
    }

    pub(crate) fn sequenced(&self) -> u64 {
        self.sequenced.load(Ordering::Relaxed)
    }

    /// Plain text with paragraph markers as newlines; anchors are invisible.
    pub(crate) fn text(&self) -> String {
        self.layout
            .lock()
            .items()
            .filter_map(|item| match item {
                Item::Char(ch) => Some(*ch),
                Item::Marker(MarkerKind::Paragraph) => Some('\n'),
                Item::Marker(_) => None,
            })
            .collect()
    }
}

fn traces(ping: Option<Duration>, at_ms: f64) -> Vec<Trace> {
    let Some(ping) = ping else {
        return Vec::new();
    };

    let mut out: Vec<Trace> = HOPS
        .iter()
        .map(|(service, action)| Trace {
            service: (*service).to_string(),
            action: (*action).to_string(),
            timestamp_ms: at_ms,
        })
        .collect();
    out.push(Trace {
        service: PING_TRACE_SERVICE.to_string(),
        action: "end".to_string(),
        timestamp_ms: ping.as_secs_f64() * 1000.0,
    });
    out
}

/// Acknowledges submitted ops strictly in submission order, each `ack_delay` after it arrived,
/// to every live subscriber of the document.
async fn sequence(
    mut rx: mpsc::UnboundedReceiver<Submitted>,
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<OpAck>>>>,
    sequenced: Arc<AtomicU64>,
    ack_delay: Duration,
    ping: Option<Duration>,
) {
    let opened = Instant::now();

    while let Some(op) = rx.recv().await {
        if !ack_delay.is_zero() {
            tokio::time::sleep_until(op.at + ack_delay).await;
        }

        let at_ms = op.at.duration_since(opened).as_secs_f64() * 1000.0;
        let ack = OpAck {
            client_sequence_number: op.client_sequence_number,
            client_id: op.client_id,
            traces: traces(ping, at_ms),
        };
        sequenced.fetch_add(1, Ordering::Relaxed);

        subscribers.lock().retain(|tx| tx.send(ack.clone()).is_ok());
    }
}
