use serde::Serialize;
use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use typeload_core::{
    ChartView, ChunkMap, ChunkReport, LoadOptions, LoadReport, MetricsEvent, MetricsFn,
    MetricsSnapshot, count_units,
};

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _corpus: &Path, _opts: &LoadOptions, _chunks: &ChunkMap) {}

    fn metrics(&self) -> Option<MetricsFn> {
        Some(Arc::new(move |event: MetricsEvent| {
            // Only periodic ticks become progress lines.
            if let MetricsEvent::Tick {
                tick,
                snapshot,
                chart,
            } = &event
            {
                emit_json_line(&build_progress_line(*tick, snapshot, chart));
            }
        }))
    }

    fn print_summary(&self, report: &LoadReport) -> anyhow::Result<()> {
        for line in build_chunk_lines(&report.chunks) {
            emit_json_line(&line);
        }
        emit_json_line(&build_summary_line(report));
        Ok(())
    }

    fn print_failures(&self, chunks: &[ChunkReport]) {
        for line in build_chunk_lines(chunks) {
            emit_json_line(&line);
        }
    }

    fn print_partition(&self, chunks: &ChunkMap) {
        for (key, text) in chunks.iter() {
            emit_json_line(&JsonPartitionLine {
                kind: "partition",
                chunk: key.to_string(),
                units: count_units(text),
                lines: text.lines().count(),
                bytes: text.len(),
            });
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSnapshot {
    pub chunk: String,
    pub elapsed_secs: f64,
    pub interval_ms: f64,

    pub units: u64,
    pub typed: u64,
    pub acked: u64,
    pub typing_progress: f64,
    pub ack_progress: f64,

    pub acks_per_sec: f64,
    pub typed_per_sec: f64,

    pub latency: JsonLatency,
    pub ping: Option<JsonPing>,
    pub histogram: JsonHistogram,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonLatency {
    pub count: u64,
    pub mean: Option<f64>,
    pub stdev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub p50: Option<f64>,
    pub p90: Option<f64>,
    pub p99: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonPing {
    pub count: u64,
    pub mean: f64,
    pub max: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonHistogram {
    pub bucket_ms: f64,
    pub counts: Vec<u64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonChart {
    pub labels: Vec<String>,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
    pub mean: Vec<f64>,
    pub stdev: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub tick: u64,
    #[serde(flatten)]
    pub snapshot: JsonSnapshot,
    pub chart: JsonChart,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonChunkLine {
    pub kind: &'static str,
    pub chunk: String,
    pub ok: bool,
    pub error: Option<String>,
    pub snapshot: Option<JsonSnapshot>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub completed: usize,
    pub failed: usize,
    pub peak_sessions: usize,
    pub representative: JsonSnapshot,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonPartitionLine {
    pub kind: &'static str,
    pub chunk: String,
    pub units: u64,
    pub lines: usize,
    pub bytes: usize,
}

fn json_snapshot(s: &MetricsSnapshot) -> JsonSnapshot {
    let defined = s.latency.is_defined();
    let when_defined = |v: f64| defined.then_some(v);

    JsonSnapshot {
        chunk: s.chunk.clone(),
        elapsed_secs: s.elapsed.as_secs_f64(),
        interval_ms: s.pacing_interval.as_secs_f64() * 1000.0,
        units: s.corpus_len,
        typed: s.typed,
        acked: s.acked,
        typing_progress: s.typing_progress,
        ack_progress: s.ack_progress,
        acks_per_sec: s.ack_rate,
        typed_per_sec: s.typing_rate,
        latency: JsonLatency {
            count: s.latency.samples,
            mean: when_defined(s.latency.mean_ms),
            stdev: when_defined(s.latency.stdev_ms),
            min: when_defined(s.latency.min_ms),
            max: when_defined(s.latency.max_ms),
            p50: s.latency.p50_ms,
            p90: s.latency.p90_ms,
            p99: s.latency.p99_ms,
        },
        ping: s.ping.map(|p| JsonPing {
            count: p.samples,
            mean: p.mean_ms,
            max: p.max_ms,
        }),
        histogram: JsonHistogram {
            bucket_ms: s.histogram_bucket_ms,
            counts: s.latency_histogram.clone(),
        },
    }
}

fn build_progress_line(tick: u64, s: &MetricsSnapshot, chart: &ChartView) -> JsonProgressLine {
    JsonProgressLine {
        kind: "progress",
        tick,
        snapshot: json_snapshot(s),
        chart: JsonChart {
            labels: chart.labels.clone(),
            min: chart.min.clone(),
            max: chart.max.clone(),
            mean: chart.mean.clone(),
            stdev: chart.stdev.clone(),
        },
    }
}

fn build_chunk_lines(chunks: &[ChunkReport]) -> Vec<JsonChunkLine> {
    chunks
        .iter()
        .map(|c| match &c.result {
            Ok(s) => JsonChunkLine {
                kind: "chunk",
                chunk: c.key.clone(),
                ok: true,
                error: None,
                snapshot: Some(json_snapshot(s)),
            },
            Err(err) => JsonChunkLine {
                kind: "chunk",
                chunk: c.key.clone(),
                ok: false,
                error: Some(err.to_string()),
                snapshot: None,
            },
        })
        .collect()
}

fn build_summary_line(report: &LoadReport) -> JsonSummaryLine {
    JsonSummaryLine {
        kind: "summary",
        completed: report.completed(),
        failed: report.failed(),
        peak_sessions: report.peak_sessions,
        representative: json_snapshot(&report.snapshot),
    }
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}
