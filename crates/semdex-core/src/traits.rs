use std::path::Path;

use crate::error::Result;
use crate::types::Neighbor;

/// Maps text to fixed-dimension, L2-normalized vectors.
pub trait Embedder: Send + Sync {
    /// Identifier recorded in the metadata store (hub id, local dir or `fake:<dim>`).
    fn model_name(&self) -> &str;
    fn dim(&self) -> usize;
    /// Embed a batch; the output has one vector per input, in input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Append-only vector store answering k-nearest-neighbor queries.
///
/// Handles are assigned in insertion order starting at 0, so the `i`-th
/// vector ever added is reported back as handle `i`.
pub trait VectorIndex {
    fn dim(&self) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()>;
    /// Up to `k` neighbors ordered by ascending distance.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;
    fn save(&self, path: &Path) -> Result<()>;
}

/// Scale `v` to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-12 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_to_unit_length() {
        let mut v = vec![3.0f32, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_is_left_alone() {
        let mut v = vec![0.0f32; 4];
        l2_normalize(&mut v);
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
