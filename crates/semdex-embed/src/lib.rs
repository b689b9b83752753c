//! Embedding backends.
//!
//! [`load_embedder`] picks the backend from a model identifier:
//! `fake` / `fake:<dim>` (or `APP_USE_FAKE_EMBEDDINGS=1`) selects the
//! hashing [`FakeEmbedder`]; anything else is loaded as a BERT sentence
//! encoder from a local directory or the Hugging Face hub.

pub mod bert;
pub mod device;
pub mod fake;
pub mod model;
pub mod pool;
pub mod tokenize;

use anyhow::{anyhow, Result};

pub use bert::BertEmbedder;
pub use fake::FakeEmbedder;
pub use pool::masked_mean_l2;
pub use semdex_core::traits::Embedder;

pub const FAKE_MODEL: &str = "fake";
pub const DEFAULT_FAKE_DIM: usize = 384;

pub fn load_embedder(model: &str) -> Result<Box<dyn Embedder>> {
    if let Some(dim) = parse_fake_model(model)? {
        tracing::info!("Using FakeEmbedder (dim={})", dim);
        return Ok(Box::new(FakeEmbedder::new(dim)));
    }
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake {
        tracing::info!("APP_USE_FAKE_EMBEDDINGS set, using FakeEmbedder instead of {}", model);
        return Ok(Box::new(FakeEmbedder::new(DEFAULT_FAKE_DIM)));
    }
    tracing::info!("Loading model: {}", model);
    Ok(Box::new(BertEmbedder::load(model)?))
}

/// `Some(dim)` for `fake` and `fake:<dim>`, `None` for any other model id.
pub fn parse_fake_model(model: &str) -> Result<Option<usize>> {
    if model == FAKE_MODEL {
        return Ok(Some(DEFAULT_FAKE_DIM));
    }
    let Some(dim) = model.strip_prefix("fake:") else {
        return Ok(None);
    };
    match dim.parse::<usize>() {
        Ok(d) if d > 0 => Ok(Some(d)),
        _ => Err(anyhow!("Invalid fake model dimension in '{}'", model)),
    }
}
