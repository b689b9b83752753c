//! Locating model files on disk or on the Hugging Face hub.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use semdex_core::config::expand_path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightsFile {
    SafeTensors(PathBuf),
    /// Legacy `pytorch_model.bin` checkpoint.
    Pickle(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: WeightsFile,
}

/// Resolve `model` to config, tokenizer and weight files.
///
/// Lookup order: `model` as a local directory, `APP_MODEL_DIR`, then `model`
/// as a hub repository id (downloaded into the hf-hub cache).
pub fn resolve_model_files(model: &str) -> Result<ModelFiles> {
    let local = expand_path(model);
    if local.is_dir() {
        tracing::debug!("Using local model dir: {}", local.display());
        return files_in_dir(&local);
    }
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.is_dir() {
            tracing::debug!("Using APP_MODEL_DIR: {}", p.display());
            return files_in_dir(&p);
        }
    }
    files_from_hub(model)
}

pub fn files_in_dir(dir: &Path) -> Result<ModelFiles> {
    let config = dir.join("config.json");
    let tokenizer = dir.join("tokenizer.json");
    for required in [&config, &tokenizer] {
        if !required.is_file() {
            return Err(anyhow!("Model file missing: {}", required.display()));
        }
    }
    let safetensors = dir.join("model.safetensors");
    let pickle = dir.join("pytorch_model.bin");
    let weights = if safetensors.is_file() {
        WeightsFile::SafeTensors(safetensors)
    } else if pickle.is_file() {
        WeightsFile::Pickle(pickle)
    } else {
        return Err(anyhow!("No model weights found in {}", dir.display()));
    };
    Ok(ModelFiles { config, tokenizer, weights })
}

fn files_from_hub(model_id: &str) -> Result<ModelFiles> {
    tracing::info!("Fetching model from hub: {}", model_id);
    let api = hf_hub::api::sync::Api::new().context("Failed to create hub client")?;
    let repo = api.model(model_id.to_string());
    let config = repo.get("config.json").with_context(|| format!("{model_id}: config.json"))?;
    let tokenizer = repo.get("tokenizer.json").with_context(|| format!("{model_id}: tokenizer.json"))?;
    let weights = match repo.get("model.safetensors") {
        Ok(path) => WeightsFile::SafeTensors(path),
        Err(e) => {
            tracing::debug!("model.safetensors unavailable ({}), trying pytorch_model.bin", e);
            let path = repo
                .get("pytorch_model.bin")
                .with_context(|| format!("{model_id}: no model weights"))?;
            WeightsFile::Pickle(path)
        }
    };
    Ok(ModelFiles { config, tokenizer, weights })
}
