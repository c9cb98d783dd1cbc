#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use typeload_core::{ChunkDispatcher, LoadOptions, MetricsEvent, MetricsFn};
use typeload_loopback::{LoopbackConfig, LoopbackServer};

pub const DOCUMENT: &str = "shared-doc";

pub fn options(concurrency: usize, pacing: Duration) -> LoadOptions {
    let mut opts = LoadOptions::new(DOCUMENT);
    opts.concurrency = concurrency;
    opts.pacing_interval = pacing;
    opts
}

pub fn server(config: LoopbackConfig) -> Arc<LoopbackServer> {
    Arc::new(LoopbackServer::new(config))
}

pub fn dispatcher(
    server: &Arc<LoopbackServer>,
    opts: LoadOptions,
) -> ChunkDispatcher<LoopbackServer> {
    ChunkDispatcher::new(server.clone(), opts)
        .unwrap_or_else(|err| panic!("invalid load options: {err}"))
}

#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<MetricsEvent>>>,
}

impl Recorder {
    pub fn sink(&self) -> MetricsFn {
        let events = self.events.clone();
        Arc::new(move |e| events.lock().push(e))
    }

    pub fn acks(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, MetricsEvent::Ack(_)))
            .count()
    }

    pub fn ticks(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, MetricsEvent::Tick { .. }))
            .count()
    }

    pub fn chunks(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .events
            .lock()
            .iter()
            .map(|e| e.snapshot().chunk.clone())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}
