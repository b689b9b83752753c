use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use semdex_core::traits::{l2_normalize, Embedder};

/// Deterministic bag-of-words hashing embedder.
///
/// Texts sharing tokens land close together, which is enough for pipeline
/// tests and offline development without model weights.
pub struct FakeEmbedder {
    dim: usize,
    name: String,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, name: format!("fake:{dim}") }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        l2_normalize(&mut v);
        v
    }
}

impl Embedder for FakeEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> semdex_core::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
