use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use typeload_metrics::{
    BucketHistogram, ChartBuffer, ChartPoint, LatencyDistribution, RateCounter, RunningLatency,
    RunningStats,
};

use crate::backend::OpAck;
use crate::config::LoadOptions;
use crate::correlator::SendAckCorrelator;
use crate::error::Result;
use crate::snapshot::{
    LatencySummary, MetricsEvent, MetricsFn, MetricsSnapshot, PingSummary, progress_ratio,
};

/// Streaming statistics for one writer session.
#[derive(Debug)]
pub struct SessionTelemetry {
    chunk: Arc<str>,
    units: u64,
    pacing_interval: Duration,
    started: Instant,

    typed: u64,
    acked: u64,
    typing: RateCounter,
    acks: RateCounter,

    correlator: SendAckCorrelator,
    latency: RunningLatency,
    distribution: LatencyDistribution,
    histogram: BucketHistogram,
    ping: RunningStats,
}

impl SessionTelemetry {
    pub fn new(chunk: Arc<str>, units: u64, opts: &LoadOptions) -> Result<Self> {
        Ok(Self {
            chunk,
            units,
            pacing_interval: opts.pacing_interval,
            started: Instant::now(),
            typed: 0,
            acked: 0,
            typing: RateCounter::new(),
            acks: RateCounter::new(),
            correlator: SendAckCorrelator::new(opts.correlation),
            latency: RunningLatency::default(),
            distribution: LatencyDistribution::new()?,
            histogram: BucketHistogram::new(opts.histogram_bucket_ms, opts.histogram_buckets)?,
            ping: RunningStats::default(),
        })
    }

    /// Restarts the rate windows; called when emission begins.
    pub fn start(&mut self) {
        self.started = Instant::now();
        self.typing.reset();
        self.acks.reset();
    }

    pub fn on_send(&mut self) {
        self.typed = self.typed.saturating_add(1);
        self.typing.increment(1.0);
        self.correlator.record_send();
    }

    /// Accounts one acknowledgement of this session's operations.
    ///
    /// Returns a snapshot when the ack resolved a round trip.
    pub fn on_ack(&mut self, ack: &OpAck) -> Option<MetricsSnapshot> {
        self.acked = self.acked.saturating_add(1);
        self.acks.increment(1.0);

        match ack.ping_ms() {
            Some(ping) => self.ping.push(ping),
            None => tracing::trace!(
                chunk = %self.chunk,
                seq = ack.client_sequence_number,
                "ack without a usable ping trace"
            ),
        }

        let rtt = self.correlator.resolve_ack()?;
        let ms = rtt.as_secs_f64() * 1000.0;
        self.latency.update(ms);
        self.distribution.record_ms(ms);
        self.histogram.add(ms);

        Some(self.snapshot())
    }

    pub fn typed(&self) -> u64 {
        self.typed
    }

    pub fn acked(&self) -> u64 {
        self.acked
    }

    pub fn units(&self) -> u64 {
        self.units
    }

    pub fn pending(&self) -> usize {
        self.correlator.pending()
    }

    pub fn is_complete(&self) -> bool {
        self.acked >= self.units
    }

    pub fn has_latency(&self) -> bool {
        self.latency.is_defined()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let est = self.latency.estimate();
        let pct = self.distribution.summary();

        MetricsSnapshot {
            chunk: self.chunk.to_string(),
            elapsed: self.started.elapsed(),
            latency: LatencySummary {
                samples: est.count,
                mean_ms: est.mean,
                stdev_ms: est.stdev,
                min_ms: est.min,
                max_ms: est.max,
                p50_ms: pct.p50,
                p90_ms: pct.p90,
                p99_ms: pct.p99,
            },
            latency_histogram: self.histogram.buckets().to_vec(),
            histogram_bucket_ms: self.histogram.width(),
            ack_rate: self.acks.rate_per_sec(),
            typing_rate: self.typing.rate_per_sec(),
            typed: self.typed,
            acked: self.acked,
            typing_progress: progress_ratio(self.typed, self.units),
            ack_progress: progress_ratio(self.acked, self.units),
            ping: (self.ping.count() > 0).then(|| PingSummary {
                samples: self.ping.count(),
                mean_ms: self.ping.mean(),
                max_ms: self.ping.max(),
            }),
            corpus_len: self.units,
            pacing_interval: self.pacing_interval,
        }
    }
}

pub(crate) fn chart_point(snapshot: &MetricsSnapshot) -> ChartPoint {
    ChartPoint {
        label: format!("{:.1}s", snapshot.elapsed.as_secs_f64()),
        min: snapshot.latency.min_ms,
        max: snapshot.latency.max_ms,
        mean: snapshot.latency.mean_ms,
        stdev: snapshot.latency.stdev_ms,
    }
}

/// Periodically publishes snapshots of `telemetry` into a chart ring and `sink`.
///
/// Ticks are skipped until the first round trip resolved. The caller aborts the task once the
/// session is terminal.
pub(crate) fn spawn_snapshot_loop(
    telemetry: Arc<Mutex<SessionTelemetry>>,
    mut chart: ChartBuffer,
    every: Duration,
    sink: MetricsFn,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // First tick completes immediately.
        interval.tick().await;

        let mut tick_id: u64 = 0;
        loop {
            interval.tick().await;

            let snapshot = {
                let telemetry = telemetry.lock();
                if !telemetry.has_latency() {
                    continue;
                }
                telemetry.snapshot()
            };

            tick_id = tick_id.saturating_add(1);
            chart.push(chart_point(&snapshot));
            (sink)(MetricsEvent::Tick {
                tick: tick_id,
                snapshot,
                chart: chart.view(),
            });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{PING_TRACE_INDEX, PING_TRACE_SERVICE, Trace};

    fn telemetry(units: u64) -> SessionTelemetry {
        SessionTelemetry::new(Arc::from("p-0"), units, &LoadOptions::new("doc"))
            .unwrap_or_else(|err| panic!("telemetry: {err}"))
    }

    fn ack(ping: Option<f64>) -> OpAck {
        let mut traces = Vec::new();
        if let Some(ping) = ping {
            traces = (0..PING_TRACE_INDEX)
                .map(|_| Trace {
                    service: "gateway".to_string(),
                    action: "start".to_string(),
                    timestamp_ms: 0.0,
                })
                .collect();
            traces.push(Trace {
                service: PING_TRACE_SERVICE.to_string(),
                action: "end".to_string(),
                timestamp_ms: ping,
            });
        }
        OpAck {
            client_sequence_number: 1,
            client_id: Arc::from("client-1"),
            traces,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ack_resolves_round_trip_and_updates_stats() {
        let mut t = telemetry(2);
        t.start();
        t.on_send();
        tokio::time::advance(Duration::from_millis(20)).await;
        t.on_send();
        tokio::time::advance(Duration::from_millis(20)).await;

        let first = t
            .on_ack(&ack(Some(3.0)))
            .unwrap_or_else(|| panic!("expected snapshot"));
        assert_eq!(first.latency.samples, 1);
        assert!((first.latency.mean_ms - 40.0).abs() < 1e-6);
        assert_eq!(first.latency.stdev_ms, 0.0);
        assert_eq!(first.ack_progress, 0.5);
        assert_eq!(first.typing_progress, 1.0);
        assert_eq!(first.latency_histogram[4], 1);

        let second = t
            .on_ack(&ack(None))
            .unwrap_or_else(|| panic!("expected snapshot"));
        assert_eq!(second.latency.samples, 2);
        assert!((second.latency.mean_ms - 30.0).abs() < 1e-6);
        assert!((second.latency.min_ms - 20.0).abs() < 1e-6);
        assert!((second.latency.max_ms - 40.0).abs() < 1e-6);
        assert_eq!(second.ping.map(|p| p.samples), Some(1));
        assert!(t.is_complete());
        assert_eq!(t.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rates_are_reported_per_second() {
        let mut t = telemetry(10);
        t.start();
        for _ in 0..10 {
            t.on_send();
        }
        tokio::time::advance(Duration::from_secs(2)).await;

        let s = t.snapshot();
        assert!((s.typing_rate - 5.0).abs() < 1e-6);
        assert_eq!(s.ack_rate, 0.0);
        assert_eq!(s.elapsed, Duration::from_secs(2));
    }

    #[test]
    fn ack_without_pending_send_is_counted_but_yields_no_snapshot() {
        let mut t = telemetry(1);
        assert!(t.on_ack(&ack(None)).is_none());
        assert_eq!(t.acked(), 1);
        assert!(!t.has_latency());
        assert_eq!(t.snapshot().ping, None);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_loop_waits_for_latency_then_fills_chart() {
        let t = Arc::new(Mutex::new(telemetry(1)));
        let events = Arc::new(Mutex::new(Vec::<MetricsEvent>::new()));
        let sink: MetricsFn = {
            let events = events.clone();
            Arc::new(move |e| events.lock().push(e))
        };
        let chart = ChartBuffer::new(3).unwrap_or_else(|err| panic!("chart: {err}"));
        let handle = spawn_snapshot_loop(t.clone(), chart, Duration::from_secs(1), sink);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(events.lock().is_empty());

        {
            let mut t = t.lock();
            t.on_send();
            let _ = t.on_ack(&ack(None));
        }

        tokio::time::sleep(Duration::from_secs(2)).await;
        handle.abort();

        let events = events.lock();
        assert_eq!(events.len(), 2);
        match &events[1] {
            MetricsEvent::Tick { tick, chart, .. } => {
                assert_eq!(*tick, 2);
                assert_eq!(chart.labels.len(), 3);
                assert_eq!(chart.labels[0], "");
                assert!(!chart.labels[2].is_empty());
            }
            MetricsEvent::Ack(_) => panic!("expected tick event"),
        }
    }
}
