use anyhow::Context as _;

use typeload_core::partition_corpus;

use crate::cli::SplitArgs;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run::read_corpus;
use crate::run_error::RunError;
use crate::run_file;

pub async fn split(args: SplitArgs) -> Result<ExitCode, RunError> {
    let text = read_corpus(&args.corpus)
        .await
        .map_err(RunError::InvalidInput)?;
    let chunks = partition_corpus(&text, args.parts).map_err(RunError::from_core)?;

    let out = output::formatter(args.output);
    out.print_partition(&chunks);

    if let Some(path) = &args.out {
        let yaml = run_file::render_chunk_map(&chunks).map_err(RunError::RuntimeError)?;
        run_file::write_text_file(path, &yaml)
            .await
            .with_context(|| format!("failed to write chunk map: {}", path.display()))
            .map_err(RunError::RuntimeError)?;
        tracing::info!(path = %path.display(), chunks = chunks.len(), "chunk map written");
    }

    Ok(ExitCode::Success)
}
