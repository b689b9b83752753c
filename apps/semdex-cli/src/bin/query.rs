use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use semdex_cli::{exit_with, init_tracing, load_settings, working_dir};
use semdex_embed::load_embedder;
use semdex_vector::{format_result, QueryEngine};

/// Search a semantic index built by `semdex-index`.
#[derive(Debug, Parser)]
#[command(name = "semdex-query", version, about)]
struct Args {
    /// Natural-language query
    query: String,

    /// Index directory to search
    #[arg(long)]
    index_dir: Option<String>,

    /// Embedding model for the query; defaults to the one the index was built with
    #[arg(long)]
    model: Option<String>,

    /// Number of results
    #[arg(long, short = 'k')]
    top_k: Option<usize>,
}

fn run(args: Args) -> Result<()> {
    let mut settings = load_settings()?;
    if let Some(index_dir) = args.index_dir {
        settings.index_dir = index_dir;
    }
    if let Some(k) = args.top_k {
        settings.top_k = k;
    }
    settings.validate()?;

    let index_dir = settings.index_path(&working_dir()?);
    let engine = QueryEngine::open(&index_dir)?;

    let model = engine.model_name(args.model.as_deref()).to_string();
    let embedder = load_embedder(&model).with_context(|| format!("Failed to load embedding model '{model}'"))?;

    tracing::info!(
        "Searching {} chunks in {} with {}",
        engine.metadata().documents.len(),
        engine.index_dir().display(),
        model
    );
    let results = engine.search(embedder.as_ref(), &args.query, settings.top_k)?;
    if results.is_empty() {
        tracing::info!("No results for: {}", args.query);
    }
    for result in &results {
        println!("{}", format_result(result));
    }
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    exit_with(run(Args::parse()))
}
