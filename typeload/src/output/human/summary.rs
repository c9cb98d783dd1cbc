use std::fmt::Write as _;

use typeload_core::{ChunkReport, LoadReport, MetricsSnapshot};

use super::format::*;

const HISTOGRAM_WIDTH: u64 = 30;

pub(crate) fn render(report: &LoadReport) -> String {
    let mut out = String::new();

    writeln!(
        out,
        "summary: {} completed, {} failed, peak sessions {}",
        report.completed(),
        report.failed(),
        report.peak_sessions
    )
    .ok();
    out.push('\n');

    out.push_str(&render_chunks(&report.chunks));
    out.push('\n');

    render_snapshot(&report.snapshot, &mut out);
    out
}

pub(crate) fn render_chunks(chunks: &[ChunkReport]) -> String {
    let mut out = String::new();

    writeln!(out, "  {:<10} {:>8} {:>8}  status", "chunk", "units", "acked").ok();
    for chunk in chunks {
        let _ = match &chunk.result {
            Ok(s) => writeln!(
                out,
                "  {:<10} {:>8} {:>8}  ok ({})",
                chunk.key,
                s.corpus_len,
                s.acked,
                format_duration_single(s.elapsed)
            ),
            Err(err) => writeln!(out, "  {:<10} {:>8} {:>8}  failed: {err}", chunk.key, "-", "-"),
        };
    }
    out
}

fn render_snapshot(s: &MetricsSnapshot, out: &mut String) {
    writeln!(
        out,
        "chunk {}: {} units in {} (interval {})",
        s.chunk,
        s.corpus_len,
        format_duration_single(s.elapsed),
        format_duration_single(s.pacing_interval)
    )
    .ok();

    if s.latency.is_defined() {
        writeln!(
            out,
            "  latency = mean={} stdev={} min={} max={} (n={})",
            format_ms(s.latency.mean_ms),
            format_ms(s.latency.stdev_ms),
            format_ms(s.latency.min_ms),
            format_ms(s.latency.max_ms),
            s.latency.samples
        )
        .ok();
        writeln!(
            out,
            "  percentiles = p50={} p90={} p99={}",
            format_ms_opt(s.latency.p50_ms),
            format_ms_opt(s.latency.p90_ms),
            format_ms_opt(s.latency.p99_ms)
        )
        .ok();
    } else {
        out.push_str("  latency: n/a\n");
    }

    writeln!(
        out,
        "  rates = acks/s={} typed/s={}",
        format_rate(s.ack_rate),
        format_rate(s.typing_rate)
    )
    .ok();

    let _ = match &s.ping {
        Some(p) => writeln!(
            out,
            "  ping = mean={} max={} (n={})",
            format_ms(p.mean_ms),
            format_ms(p.max_ms),
            p.samples
        ),
        None => writeln!(out, "  ping: n/a"),
    };

    render_histogram(&s.latency_histogram, s.histogram_bucket_ms, out);
}

fn render_histogram(counts: &[u64], width_ms: f64, out: &mut String) {
    let peak = counts.iter().copied().max().unwrap_or(0);
    if peak == 0 {
        return;
    }

    writeln!(out, "  histogram ({} buckets)", format_ms(width_ms)).ok();
    let last = counts.len().saturating_sub(1);
    for (idx, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }

        let lo = width_ms * idx as f64;
        let range = if idx == last {
            format!(">= {}", format_ms(lo))
        } else {
            format!("{}..{}", format_ms(lo), format_ms(lo + width_ms))
        };
        let bar = "█".repeat((count.saturating_mul(HISTOGRAM_WIDTH) / peak).max(1) as usize);
        writeln!(out, "    {range:>16} {bar} {count}").ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typeload_core::{Error, LatencySummary};

    fn snapshot() -> MetricsSnapshot {
        MetricsSnapshot {
            chunk: "p-0".to_string(),
            corpus_len: 5,
            acked: 5,
            typed: 5,
            latency: LatencySummary {
                samples: 5,
                mean_ms: 3.0,
                stdev_ms: 0.5,
                min_ms: 2.0,
                max_ms: 4.0,
                p50_ms: Some(3.0),
                p90_ms: Some(4.0),
                p99_ms: Some(4.0),
            },
            latency_histogram: vec![5, 0, 0],
            histogram_bucket_ms: 10.0,
            ..MetricsSnapshot::default()
        }
    }

    #[test]
    fn summary_lists_every_chunk_and_the_representative() {
        let report = LoadReport {
            snapshot: snapshot(),
            chunks: vec![
                ChunkReport {
                    key: "p-0".to_string(),
                    result: Ok(snapshot()),
                },
                ChunkReport {
                    key: "p-1".to_string(),
                    result: Err(Error::NotConnected("p-1".to_string())),
                },
            ],
            peak_sessions: 2,
        };

        let text = render(&report);
        assert!(text.contains("1 completed, 1 failed, peak sessions 2"));
        assert!(text.contains("p-1"));
        assert!(text.contains("failed: driver for chunk `p-1` has no backend session"));
        assert!(text.contains("p50=3.00ms"));
        assert!(text.contains("ping: n/a"));
        assert!(text.contains("0.00ms..10.0ms"));
    }

    #[test]
    fn empty_histogram_is_omitted() {
        let mut out = String::new();
        render_histogram(&[0, 0], 10.0, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn failed_chunks_render_without_a_representative() {
        let chunks = vec![ChunkReport {
            key: "p-0".to_string(),
            result: Err(Error::NotConnected("p-0".to_string())),
        }];

        let out = render_chunks(&chunks);
        assert!(out.contains("p-0"));
        assert!(out.contains("failed: driver for chunk `p-0` has no backend session"));
        assert!(!out.contains("latency"));
    }
}
