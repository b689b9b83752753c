//! Shared setup for the `semdex-index` and `semdex-query` binaries.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use semdex_core::config::{Config, Settings};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter};

/// Log to stderr so stdout carries only command output. `RUST_LOG` overrides
/// the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Layered settings from files and `APP_*` variables, before flags are applied.
pub fn load_settings() -> Result<Settings> {
    let config = Config::load().context("Error loading config")?;
    config.settings().context("Invalid configuration")
}

pub fn working_dir() -> Result<PathBuf> {
    std::env::current_dir().context("Could not determine the current directory")
}

/// Map a run result to the process exit status, logging the error chain.
pub fn exit_with(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", describe(&e));
            ExitCode::FAILURE
        }
    }
}

/// Missing inputs get a short message with a hint; anything else the full chain.
pub fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<semdex_core::Error>() {
        Some(e @ (semdex_core::Error::IndexDirNotFound(_)
        | semdex_core::Error::MetadataNotFound(_)
        | semdex_core::Error::IndexNotFound(_)
        | semdex_core::Error::EmptyIndex)) => {
            format!("{e}. Run semdex-index first to build the index.")
        }
        Some(e) if e.is_precondition() => e.to_string(),
        _ => format!("{err:#}"),
    }
}
