use anyhow::Context as _;
use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncBufReadExt as _;
use tokio::task::JoinHandle;
use typeload_core::{ChunkDispatcher, ChunkMap, LoadOptions, partition_corpus};
use typeload_loopback::{LoopbackConfig, LoopbackServer};

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::RunError;
use crate::run_file::{self, RunFile, YamlDuration};

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub options: LoadOptions,
    pub loopback: LoopbackConfig,
    pub parts: usize,
}

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let file = match &args.config {
        Some(path) => run_file::load_run_file(path)
            .await
            .map_err(RunError::InvalidInput)?,
        None => RunFile::default(),
    };

    let settings = resolve_settings(&args, &file).map_err(RunError::InvalidInput)?;
    settings.options.validate().map_err(RunError::from_core)?;

    let chunks = load_chunks(&args.corpus, settings.parts)
        .await
        .map_err(RunError::InvalidInput)?;

    let server = Arc::new(LoopbackServer::new(settings.loopback.clone()));
    let dispatcher = Arc::new(
        ChunkDispatcher::new(server.clone(), settings.options.clone())
            .map_err(RunError::from_core)?,
    );

    let out = output::formatter(args.output);
    out.print_header(&args.corpus, dispatcher.options(), &chunks);

    let control = args
        .interactive
        .then(|| spawn_stdin_control(dispatcher.clone()));

    let res = dispatcher.run(&chunks, out.metrics()).await;

    if let Some(h) = control {
        h.abort();
    }

    let report = match res {
        Ok(report) => report,
        Err(err) => {
            out.abandon();
            if let typeload_core::Error::NoChunkCompleted { chunks } = &err {
                out.print_failures(chunks);
            }
            return Err(RunError::from_core(err));
        }
    };

    out.print_summary(&report)
        .map_err(RunError::RuntimeError)?;

    tracing::debug!(
        sessions = server.stats().sessions_total(),
        ops = server.stats().ops_total(),
        refused = server.stats().refused_total(),
        "loopback backend totals"
    );
    server.close_document(&dispatcher.options().document);

    Ok(ExitCode::from_failed_chunks(report.failed()))
}

/// Merges CLI flags over the run file over built-in defaults.
pub(crate) fn resolve_settings(args: &RunArgs, file: &RunFile) -> anyhow::Result<Settings> {
    let document = args
        .document
        .clone()
        .or_else(|| file.document.clone())
        .unwrap_or_else(|| default_document(&args.corpus));

    let mut opts = LoadOptions::new(document);
    if let Some(v) = args.interval.or(file.interval.map(YamlDuration::into_inner)) {
        opts.pacing_interval = v;
    }
    if let Some(v) = args.concurrency.or(file.concurrency) {
        opts.concurrency = v;
    }
    if let Some(v) = args.checkpoint_every.or(file.checkpoint_every) {
        opts.checkpoint_every = v;
    }
    if let Some(v) = args
        .snapshot_interval
        .or(file.snapshot_interval.map(YamlDuration::into_inner))
    {
        opts.snapshot_interval = v;
    }
    if let Some(v) = args.correlation.or(file.correlation()?) {
        opts.correlation = v;
    }
    if let Some(v) = file.histogram.bucket_ms {
        opts.histogram_bucket_ms = v;
    }
    if let Some(v) = file.histogram.buckets {
        opts.histogram_buckets = v;
    }
    if let Some(v) = file.chart_len {
        opts.chart_len = v;
    }

    let parts = args.chunks.or(file.chunks).unwrap_or(opts.concurrency);
    if parts == 0 {
        anyhow::bail!("--chunks must be a positive integer");
    }

    let loopback = LoopbackConfig {
        ack_delay: args
            .ack_delay
            .or(file.loopback.ack_delay.map(YamlDuration::into_inner))
            .unwrap_or_default(),
        ping: args
            .ping
            .or(file.loopback.ping.map(YamlDuration::into_inner)),
        refuse_connections: args
            .refuse_connections
            .or(file.loopback.refuse_connections)
            .unwrap_or(0),
    };

    Ok(Settings {
        options: opts,
        loopback,
        parts,
    })
}

fn default_document(corpus: &Path) -> String {
    corpus
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.trim().is_empty())
        .map_or_else(|| "typeload".to_string(), |s| format!("typeload-{s}"))
}

pub(crate) async fn read_corpus(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read corpus: {}", path.display()))
}

async fn load_chunks(path: &Path, parts: usize) -> anyhow::Result<ChunkMap> {
    let chunks = if run_file::looks_like_yaml_path(path) {
        run_file::load_chunk_map(path).await?
    } else {
        let text = read_corpus(path).await?;
        partition_corpus(&text, parts).context("failed to partition corpus")?
    };

    if chunks.is_empty() {
        anyhow::bail!("corpus is empty: {}", path.display());
    }
    Ok(chunks)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    Pause,
    Resume,
    Toggle,
}

pub(crate) fn parse_control(line: &str) -> Option<Control> {
    match line.trim().to_ascii_lowercase().as_str() {
        "pause" | "p" => Some(Control::Pause),
        "resume" | "r" => Some(Control::Resume),
        "" | "toggle" | "t" => Some(Control::Toggle),
        _ => None,
    }
}

fn spawn_stdin_control(dispatcher: Arc<ChunkDispatcher<LoopbackServer>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            match parse_control(&line) {
                Some(Control::Pause) if dispatcher.is_paused() => {
                    tracing::debug!("writers already paused");
                }
                Some(Control::Resume) if !dispatcher.is_paused() => {
                    tracing::debug!("writers already running");
                }
                Some(Control::Pause) => dispatcher.pause_all(),
                Some(Control::Resume) => dispatcher.resume_all(),
                Some(Control::Toggle) => {
                    dispatcher.toggle_pause();
                }
                None => tracing::warn!(input = line.trim(), "unknown command (expected pause/resume)"),
            }
        }
    })
}
