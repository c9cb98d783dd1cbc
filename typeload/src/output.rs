use std::path::Path;

use typeload_core::{ChunkMap, ChunkReport, LoadOptions, LoadReport, MetricsFn};

use crate::cli::OutputFormat;

mod human;
mod json;

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, corpus: &Path, opts: &LoadOptions, chunks: &ChunkMap);
    fn metrics(&self) -> Option<MetricsFn>;
    fn print_summary(&self, report: &LoadReport) -> anyhow::Result<()>;

    /// Reports chunk outcomes of a run in which no chunk completed.
    fn print_failures(&self, chunks: &[ChunkReport]);

    /// Clears live progress before an early exit.
    fn abandon(&self) {}

    fn print_partition(&self, chunks: &ChunkMap);
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
