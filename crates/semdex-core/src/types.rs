//! Domain types shared by the index builder and the query engine.

use serde::{Deserialize, Serialize};

/// One retrieval unit: a line-bounded span of a source file.
///
/// - `path`: file path relative to the indexed root
/// - `start_line`: 1-based, inclusive
/// - `end_line`: 1-based, exclusive (`start_line < end_line`)
/// - `content`: trimmed chunk text, never empty
/// - `mtime`: source file modification time in epoch seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    pub mtime: f64,
}

/// Contents of `metadata.json`.
///
/// `documents[i]` describes the vector stored under handle `i` in the
/// vector index; the order of the list is load-bearing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub model: String,
    pub embedding_dim: usize,
    pub chunk_chars: usize,
    pub overlap_lines: usize,
    pub indexed_at: i64,
    pub documents: Vec<DocumentChunk>,
}

/// A raw hit from the vector index. Smaller distance is closer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub handle: u64,
    pub distance: f32,
}

/// A query hit resolved against the metadata store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub rank: usize,
    pub path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub distance: f32,
    pub preview: String,
}
