use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use semdex_cli::{exit_with, init_tracing, load_settings, working_dir};
use semdex_embed::load_embedder;
use semdex_vector::{BuildOptions, IndexBuilder};

/// Build a semantic index over the source files under a directory.
#[derive(Debug, Parser)]
#[command(name = "semdex-index", version, about)]
struct Args {
    /// Directory to index
    #[arg(long)]
    root: Option<String>,

    /// Where to write the index
    #[arg(long)]
    index_dir: Option<String>,

    /// Embedding model id, local model directory, or `fake[:dim]`
    #[arg(long)]
    model: Option<String>,

    /// Character budget per chunk
    #[arg(long)]
    chunk_chars: Option<usize>,

    /// Lines shared between consecutive chunks
    #[arg(long)]
    overlap_lines: Option<usize>,

    /// Chunks embedded per model call
    #[arg(long)]
    batch_size: Option<usize>,

    /// File extensions to index (repeatable), e.g. `--ext .rs --ext .toml`
    #[arg(long = "ext", value_name = "EXT")]
    extensions: Vec<String>,

    /// Hide the progress bar
    #[arg(long, short)]
    quiet: bool,
}

fn run(args: Args) -> Result<()> {
    let mut settings = load_settings()?;
    if let Some(root) = args.root {
        settings.root = root;
    }
    if let Some(index_dir) = args.index_dir {
        settings.index_dir = index_dir;
    }
    if let Some(model) = args.model {
        settings.model = model;
    }
    if let Some(n) = args.chunk_chars {
        settings.chunk_chars = n;
    }
    if let Some(n) = args.overlap_lines {
        settings.overlap_lines = n;
    }
    if let Some(n) = args.batch_size {
        settings.batch_size = n;
    }
    if !args.extensions.is_empty() {
        settings.extensions = args.extensions;
    }
    settings.validate()?;

    let cwd = working_dir()?;
    let root = settings.root_path(&cwd);
    let index_dir = settings.index_path(&cwd);

    let embedder = load_embedder(&settings.model)
        .with_context(|| format!("Failed to load embedding model '{}'", settings.model))?;
    let options = BuildOptions { show_progress: !args.quiet, ..BuildOptions::from_settings(&settings) };

    let summary = IndexBuilder::new(embedder.as_ref(), options).build(&root, &index_dir)?;
    if summary.files_skipped > 0 {
        tracing::warn!("Skipped {} unreadable files", summary.files_skipped);
    }
    tracing::info!(
        "Successfully indexed {} chunks from {} files into {}",
        summary.chunks,
        summary.files_seen - summary.files_skipped,
        summary.index_dir.display()
    );
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    exit_with(run(Args::parse()))
}
