//! Vector index backed by usearch.
//!
//! Vectors are keyed by insertion position, so key `i` is the `i`-th vector
//! ever added and lines up with `documents[i]` in the metadata store.
//! Distances are squared L2; on unit vectors that ranks like cosine.
//! Queries scan every stored vector, so results are the true top-k rather
//! than an approximate HNSW walk.

use std::path::Path;

use usearch::ffi::{IndexOptions, MetricKind, ScalarKind};

use semdex_core::error::{Error, Result};
use semdex_core::traits::VectorIndex;
use semdex_core::types::Neighbor;

pub const INDEX_FILE: &str = "index.usearch";

const MIN_RESERVE: usize = 1024;

pub struct UsearchIndex {
    inner: usearch::Index,
    dim: usize,
}

fn engine_err(context: &str, e: impl std::fmt::Display) -> Error {
    Error::IndexEngine(format!("{context}: {e}"))
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| Error::IndexEngine(format!("non UTF-8 index path: {}", path.display())))
}

impl UsearchIndex {
    fn options(dim: usize) -> IndexOptions {
        IndexOptions {
            dimensions: dim,
            metric: MetricKind::L2sq,
            quantization: ScalarKind::F32,
            connectivity: 0,
            expansion_add: 0,
            expansion_search: 0,
            multi: false,
        }
    }

    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::IndexEngine("embedding dimension must be non-zero".into()));
        }
        let inner = usearch::Index::new(&Self::options(dim))
            .map_err(|e| engine_err("failed to create vector index", e))?;
        Ok(Self { inner, dim })
    }

    /// Load a saved index, checking it was built for `dim`-sized vectors.
    pub fn load(path: &Path, dim: usize) -> Result<Self> {
        let index = Self::new(dim)?;
        index
            .inner
            .load(path_str(path)?)
            .map_err(|e| engine_err(&format!("failed to load {}", path.display()), e))?;
        let stored = index.inner.dimensions();
        if stored != dim {
            return Err(Error::DimensionMismatch { expected: dim, actual: stored });
        }
        Ok(index)
    }

    fn ensure_capacity(&self, additional: usize) -> Result<()> {
        let needed = self.inner.size() + additional;
        if needed > self.inner.capacity() {
            let target = needed.max(self.inner.capacity() * 2).max(MIN_RESERVE);
            self.inner
                .reserve(target)
                .map_err(|e| engine_err("failed to reserve index capacity", e))?;
        }
        Ok(())
    }
}

impl VectorIndex for UsearchIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.inner.size()
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dim) {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: bad.len() });
        }
        self.ensure_capacity(vectors.len())?;
        let base = self.inner.size();
        for (offset, vector) in vectors.iter().enumerate() {
            let handle = (base + offset) as u64;
            self.inner
                .add(handle, vector.as_slice())
                .map_err(|e| engine_err("failed to add vector", e))?;
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        let matches = self
            .inner
            .exact_search(query, k)
            .map_err(|e| engine_err("vector search failed", e))?;
        Ok(matches
            .keys
            .iter()
            .zip(matches.distances.iter())
            .map(|(&handle, &distance)| Neighbor { handle, distance })
            .collect())
    }

    fn save(&self, path: &Path) -> Result<()> {
        self.inner
            .save(path_str(path)?)
            .map_err(|e| engine_err(&format!("failed to save {}", path.display()), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn unit(dim: usize, axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[axis] = 1.0;
        v
    }

    #[test]
    fn handles_follow_insertion_order_across_batches() {
        let mut index = UsearchIndex::new(4).unwrap();
        index.add(&[unit(4, 0), unit(4, 1)]).unwrap();
        index.add(&[unit(4, 2)]).unwrap();
        assert_eq!(index.len(), 3);
        for axis in 0..3 {
            let hits = index.search(&unit(4, axis), 1).unwrap();
            assert_eq!(hits[0].handle, axis as u64);
            assert!(hits[0].distance.abs() < 1e-6);
        }
    }

    #[test]
    fn fewer_vectors_than_k() {
        let mut index = UsearchIndex::new(3).unwrap();
        index.add(&[unit(3, 0), unit(3, 1)]).unwrap();
        let hits = index.search(&unit(3, 0), 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let mut index = UsearchIndex::new(3).unwrap();
        assert!(matches!(
            index.add(&[vec![1.0, 0.0]]),
            Err(Error::DimensionMismatch { expected: 3, actual: 2 })
        ));
        assert!(index.search(&[1.0], 1).is_err());
        assert!(UsearchIndex::new(0).is_err());
    }

    /// xorshift64, deterministic across runs.
    fn random_unit_vectors(count: usize, dim: usize, mut seed: u64) -> Vec<Vec<f32>> {
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            (seed >> 40) as f32 / (1u64 << 24) as f32 - 0.5
        };
        (0..count)
            .map(|_| {
                let mut v: Vec<f32> = (0..dim).map(|_| next()).collect();
                semdex_core::traits::l2_normalize(&mut v);
                v
            })
            .collect()
    }

    fn l2sq(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
    }

    #[test]
    fn search_returns_true_nearest_neighbors() {
        let dim = 64;
        let k = 10;
        let vectors = random_unit_vectors(5_000, dim, 0x9E37_79B9_7F4A_7C15);
        let mut index = UsearchIndex::new(dim).unwrap();
        for batch in vectors.chunks(32) {
            index.add(batch).unwrap();
        }

        for query in random_unit_vectors(50, dim, 0xD1B5_4A32_D192_ED03) {
            let mut expected: Vec<(usize, f32)> =
                vectors.iter().enumerate().map(|(i, v)| (i, l2sq(&query, v))).collect();
            expected.sort_by(|a, b| a.1.total_cmp(&b.1));
            let kth = expected[k - 1].1;

            let hits = index.search(&query, k).unwrap();
            assert_eq!(hits.len(), k);
            for hit in &hits {
                let true_distance = l2sq(&query, &vectors[hit.handle as usize]);
                assert!(
                    true_distance <= kth + 1e-4,
                    "handle {} at {} is outside the top {} (cutoff {})",
                    hit.handle,
                    true_distance,
                    k,
                    kth
                );
            }
        }
    }

    #[test]
    fn save_and_load_preserve_handles() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(INDEX_FILE);
        let mut index = UsearchIndex::new(4).unwrap();
        index.add(&[unit(4, 3), unit(4, 1)]).unwrap();
        index.save(&path).unwrap();

        let loaded = UsearchIndex::load(&path, 4).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.search(&unit(4, 1), 1).unwrap()[0].handle, 1);
    }
}
