use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use typeload_core::CorrelationOrder;

pub(crate) fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        ));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"))?;

    match unit_str.trim() {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Ok(Duration::from_secs(value)),
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => {
            Ok(Duration::from_millis(value))
        }
        "us" | "µs" | "usec" | "usecs" | "microsecond" | "microseconds" => {
            Ok(Duration::from_micros(value))
        }
        "m" | "min" | "mins" | "minute" | "minutes" => {
            let secs = value
                .checked_mul(60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        _ => Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        )),
    }
}

fn parse_correlation(input: &str) -> Result<CorrelationOrder, String> {
    input
        .trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|_| format!("invalid correlation order '{input}' (expected fifo or lifo)"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Progress bars and a summary table.
    HumanReadable,
    /// Emit JSON lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "typeload",
    author,
    version,
    about = "Collaborative editing load generator",
    long_about = "typeload simulates many writers typing a text corpus into one shared document, character by character, and measures how quickly the backend acknowledges each operation.\n\nThe corpus is split into chunks; every chunk is typed by its own session and at most `--concurrency` sessions are active at a time.",
    after_help = "Examples:\n  typeload run corpus.txt --document doc-1 --concurrency 4\n  typeload run corpus.txt --interval 50ms --ack-delay 5ms --output json\n  typeload split corpus.txt --parts 8 --out chunks.yaml\n  typeload run chunks.yaml --config run.yaml --interactive"
)]
pub struct Cli {
    /// Log filter (e.g. `debug`, `typeload_core=trace`). Defaults to TYPELOAD_LOG or `warn`.
    #[arg(long, global = true, env = "TYPELOAD_LOG")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Type a corpus into a shared document with concurrent writer sessions
    #[command(
        long_about = "Type a corpus into a shared document.\n\nCORPUS is either a text file (split on line boundaries into `--chunks` parts) or a YAML chunk map produced by `typeload split --out`.\n\nCLI flags override values from `--config`."
    )]
    Run(RunArgs),

    /// Split a corpus into line-aligned chunks
    Split(SplitArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Corpus text file, or a YAML chunk map (.yaml/.yml)
    pub corpus: PathBuf,

    /// YAML run file with defaults for the flags below
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Target document id
    #[arg(long)]
    pub document: Option<String>,

    /// Delay between two typed characters (e.g. 50ms; 0 = unpaced)
    #[arg(long, value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// Maximum number of concurrently active writer sessions
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Number of chunks to split a text corpus into (defaults to --concurrency)
    #[arg(long)]
    pub chunks: Option<usize>,

    /// Request a checkpoint every N lines
    #[arg(long)]
    pub checkpoint_every: Option<u64>,

    /// Period of live metric snapshots
    #[arg(long, value_parser = parse_duration)]
    pub snapshot_interval: Option<Duration>,

    /// How acknowledgements are matched to pending sends (fifo or lifo)
    #[arg(long, value_parser = parse_correlation)]
    pub correlation: Option<CorrelationOrder>,

    /// Simulated backend: delay before an operation is acknowledged
    #[arg(long, value_parser = parse_duration)]
    pub ack_delay: Option<Duration>,

    /// Simulated backend: ping reported on every acknowledgement
    #[arg(long, value_parser = parse_duration)]
    pub ping: Option<Duration>,

    /// Simulated backend: refuse the first N session connections
    #[arg(long)]
    pub refuse_connections: Option<usize>,

    /// Read `pause` / `resume` commands from stdin while running
    #[arg(long)]
    pub interactive: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct SplitArgs {
    /// Corpus text file
    pub corpus: PathBuf,

    /// Number of chunks
    #[arg(long, default_value_t = 1)]
    pub parts: usize,

    /// Write the chunk map as YAML to this file
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}
