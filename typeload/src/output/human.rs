use std::path::Path;
use std::sync::Arc;

use typeload_core::{
    ChunkMap, ChunkReport, LoadOptions, LoadReport, MetricsEvent, MetricsFn, count_units,
};

mod format;
mod progress;
mod summary;

use format::*;
use progress::HumanProgress;

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, corpus: &Path, opts: &LoadOptions, chunks: &ChunkMap) {
        let units: u64 = chunks.iter().map(|(_, text)| count_units(text)).sum();

        println!("corpus: {}", corpus.display());
        println!(
            "document: {} chunks={} units={} concurrency={} interval={} correlation={}",
            opts.document,
            chunks.len(),
            units,
            opts.concurrency,
            format_duration_single(opts.pacing_interval),
            opts.correlation
        );
        println!();
    }

    fn metrics(&self) -> Option<MetricsFn> {
        let progress = self.progress.clone();

        Some(Arc::new(move |event: MetricsEvent| {
            let s = event.snapshot();
            progress.update(&s.chunk, s.corpus_len, s.acked, progress_message(&event));
        }))
    }

    fn print_summary(&self, report: &LoadReport) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", summary::render(report));
        Ok(())
    }

    fn print_failures(&self, chunks: &[ChunkReport]) {
        self.progress.finish();
        print!("{}", summary::render_chunks(chunks));
    }

    fn abandon(&self) {
        self.progress.finish();
    }

    fn print_partition(&self, chunks: &ChunkMap) {
        println!("{:<10} {:>8} {:>8}", "chunk", "units", "lines");
        for (key, text) in chunks.iter() {
            println!(
                "{key:<10} {:>8} {:>8}",
                count_units(text),
                text.lines().count()
            );
        }
    }
}

fn progress_message(event: &MetricsEvent) -> String {
    let s = event.snapshot();

    let mut msg = format!(
        "lat={}±{} acks/s={} typed/s={}",
        format_ms(s.latency.mean_ms),
        format_ms(s.latency.stdev_ms),
        format_rate(s.ack_rate),
        format_rate(s.typing_rate)
    );
    if let Some(p99) = s.latency.p99_ms {
        msg.push_str(&format!(" p99={}", format_ms(p99)));
    }
    if let Some(ping) = &s.ping {
        msg.push_str(&format!(" ping={}", format_ms(ping.mean_ms)));
    }
    msg.push_str(&format!(" typed={}", format_percent(s.typing_progress)));
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use typeload_core::{MetricsSnapshot, PingSummary};

    #[test]
    fn progress_message_includes_optional_fields() {
        let mut s = MetricsSnapshot {
            chunk: "p-0".to_string(),
            typing_progress: 0.5,
            ..MetricsSnapshot::default()
        };
        s.latency.mean_ms = 12.0;
        s.latency.p99_ms = Some(20.0);
        s.ping = Some(PingSummary {
            samples: 1,
            mean_ms: 3.0,
            max_ms: 3.0,
        });

        let msg = progress_message(&MetricsEvent::Ack(s));
        assert!(msg.starts_with("lat=12.0ms±0.00ms"));
        assert!(msg.contains("p99=20.0ms"));
        assert!(msg.contains("ping=3.00ms"));
        assert!(msg.ends_with("typed=50%"));
    }

    #[test]
    fn metrics_sink_creates_one_bar_per_chunk() {
        let out = HumanReadableOutput::new();
        let sink = out.metrics().unwrap_or_else(|| panic!("expected a sink"));

        for chunk in ["p-0", "p-1", "p-0"] {
            sink(MetricsEvent::Ack(MetricsSnapshot {
                chunk: chunk.to_string(),
                corpus_len: 10,
                acked: 1,
                ..MetricsSnapshot::default()
            }));
        }
        assert_eq!(out.progress.bars(), 2);
        out.abandon();
        assert_eq!(out.progress.bars(), 0);
    }
}
