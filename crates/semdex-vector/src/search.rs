use std::path::{Path, PathBuf};

use semdex_core::error::{Error, Result};
use semdex_core::traits::{l2_normalize, Embedder, VectorIndex};
use semdex_core::types::{IndexMetadata, SearchResult};

use crate::index::{UsearchIndex, INDEX_FILE};
use crate::metadata::{read_metadata, METADATA_FILE};

pub const PREVIEW_CHARS: usize = 240;

/// A loaded index directory, ready to answer queries.
pub struct QueryEngine {
    metadata: IndexMetadata,
    index: UsearchIndex,
    index_dir: PathBuf,
}

impl QueryEngine {
    pub fn open(index_dir: &Path) -> Result<Self> {
        if !index_dir.is_dir() {
            return Err(Error::IndexDirNotFound(index_dir.to_path_buf()));
        }
        let metadata = read_metadata(&index_dir.join(METADATA_FILE))?;
        if metadata.documents.is_empty() {
            return Err(Error::EmptyIndex);
        }
        let index_path = index_dir.join(INDEX_FILE);
        if !index_path.exists() {
            return Err(Error::IndexNotFound(index_path));
        }
        let index = UsearchIndex::load(&index_path, metadata.embedding_dim)?;
        if index.len() < metadata.documents.len() {
            return Err(Error::IndexEngine(format!(
                "{} holds {} vectors but metadata lists {} documents; rebuild the index",
                index_path.display(),
                index.len(),
                metadata.documents.len()
            )));
        }
        if index.len() > metadata.documents.len() {
            tracing::warn!(
                "Index holds {} vectors but metadata lists {} documents",
                index.len(),
                metadata.documents.len()
            );
        }
        tracing::debug!("Opened index at {} ({} documents)", index_dir.display(), metadata.documents.len());
        Ok(Self { metadata, index, index_dir: index_dir.to_path_buf() })
    }

    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// The model to embed queries with: an explicit override, else the one
    /// the index was built with.
    pub fn model_name<'a>(&'a self, override_model: Option<&'a str>) -> &'a str {
        override_model.unwrap_or(&self.metadata.model)
    }

    /// Nearest chunks to `query`, closest first, at most `k` of them.
    pub fn search(&self, embedder: &dyn Embedder, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        if embedder.dim() != self.metadata.embedding_dim {
            return Err(Error::DimensionMismatch {
                expected: self.metadata.embedding_dim,
                actual: embedder.dim(),
            });
        }
        let mut vectors = embedder.embed_batch(&[query.to_string()])?;
        let Some(mut vector) = vectors.pop() else {
            return Err(Error::Embedding("model returned no vector for the query".into()));
        };
        l2_normalize(&mut vector);
        if vector.len() != self.metadata.embedding_dim {
            return Err(Error::DimensionMismatch {
                expected: self.metadata.embedding_dim,
                actual: vector.len(),
            });
        }

        let mut neighbors = self.index.search(&vector, k)?;
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let results = neighbors
            .into_iter()
            .filter_map(|n| {
                let doc = usize::try_from(n.handle).ok().and_then(|i| self.metadata.documents.get(i));
                if doc.is_none() {
                    tracing::debug!("Skipping handle {} with no document", n.handle);
                }
                doc.map(|doc| (doc, n.distance))
            })
            .take(k)
            .enumerate()
            .map(|(i, (doc, distance))| SearchResult {
                rank: i + 1,
                path: doc.path.clone(),
                start_line: doc.start_line,
                end_line: doc.end_line,
                distance,
                preview: preview(&doc.content),
            })
            .collect();
        Ok(results)
    }
}

/// Single-line excerpt: whitespace runs collapsed, cut to [`PREVIEW_CHARS`].
pub fn preview(content: &str) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= PREVIEW_CHARS {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(PREVIEW_CHARS - 3).collect();
    cut.push_str("...");
    cut
}

pub fn format_result(result: &SearchResult) -> String {
    format!(
        "{}. {}:{}-{} (distance={:.3})\n   {}",
        result.rank, result.path, result.start_line, result.end_line, result.distance, result.preview
    )
}
