//! Layered configuration and path helpers.
//!
//! Figment merges built-in defaults, `semdex.toml`, `semdex.<env>.toml`
//! (env from `RUST_ENV`, default `dev`) and `APP_*` environment variables,
//! in that order. Command-line flags are applied on top by the binaries.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::walker::{DiscoveryOptions, DEFAULT_EXTENSIONS, DEFAULT_IGNORE_DIRS};

pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_INDEX_DIR: &str = "index_data";
pub const DEFAULT_CHUNK_CHARS: usize = 1200;
pub const DEFAULT_OVERLAP_LINES: usize = 3;
pub const DEFAULT_BATCH_SIZE: usize = 32;
pub const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub root: String,
    pub index_dir: String,
    pub model: String,
    pub chunk_chars: usize,
    pub overlap_lines: usize,
    pub batch_size: usize,
    pub top_k: usize,
    pub extensions: Vec<String>,
    pub ignore_dirs: Vec<String>,
    pub always_include: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            index_dir: DEFAULT_INDEX_DIR.to_string(),
            model: DEFAULT_MODEL.to_string(),
            chunk_chars: DEFAULT_CHUNK_CHARS,
            overlap_lines: DEFAULT_OVERLAP_LINES,
            batch_size: DEFAULT_BATCH_SIZE,
            top_k: DEFAULT_TOP_K,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|s| s.to_string()).collect(),
            always_include: Vec::new(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_chars == 0 {
            return Err(Error::InvalidConfig("chunk_chars must be greater than 0".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be greater than 0".into()));
        }
        if self.top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be greater than 0".into()));
        }
        if self.model.trim().is_empty() {
            return Err(Error::InvalidConfig("model must not be empty".into()));
        }
        Ok(())
    }

    pub fn root_path(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.root)
    }

    pub fn index_path(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.index_dir)
    }

    /// Extensions are stored with a leading dot; `rs` and `.rs` are equivalent.
    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            extensions: self
                .extensions
                .iter()
                .map(|ext| if ext.starts_with('.') { ext.clone() } else { format!(".{ext}") })
                .collect(),
            ignore_dirs: self.ignore_dirs.iter().cloned().collect(),
            always_include: self.always_include.iter().cloned().collect(),
        }
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("semdex.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("semdex.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("semdex.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("semdex.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_"));
        Ok(Self { figment })
    }

    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
