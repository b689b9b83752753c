//! Full index builds.
//!
//! Files are chunked as they are read and chunk texts are embedded in
//! fixed-size batches, so at most one batch of texts and vectors is held
//! besides the growing index. Artifacts are written to a staging directory
//! next to the destination and renamed into place once complete.

use std::fs;
use std::mem;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use indicatif::{ProgressBar, ProgressStyle};

use semdex_core::chunker::{chunk_lines, split_lines};
use semdex_core::config::Settings;
use semdex_core::error::{Error, Result};
use semdex_core::traits::{l2_normalize, Embedder, VectorIndex};
use semdex_core::types::{DocumentChunk, IndexMetadata};
use semdex_core::walker::{discover_files, DiscoveryOptions, SourceFile};

use crate::index::{UsearchIndex, INDEX_FILE};
use crate::metadata::{write_metadata, METADATA_FILE};

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub chunk_chars: usize,
    pub overlap_lines: usize,
    pub batch_size: usize,
    pub discovery: DiscoveryOptions,
    pub show_progress: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl BuildOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            chunk_chars: settings.chunk_chars,
            overlap_lines: settings.overlap_lines,
            batch_size: settings.batch_size.max(1),
            discovery: settings.discovery_options(),
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub files_seen: usize,
    pub files_skipped: usize,
    pub chunks: usize,
    pub embedding_dim: usize,
    pub index_dir: PathBuf,
}

/// Chunk texts waiting to be embedded, with their records in the same order.
#[derive(Default)]
struct Batch {
    texts: Vec<String>,
    docs: Vec<DocumentChunk>,
}

impl Batch {
    fn push(&mut self, doc: DocumentChunk) {
        self.texts.push(doc.content.clone());
        self.docs.push(doc);
    }

    fn len(&self) -> usize {
        self.texts.len()
    }

    fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    fn take(&mut self) -> (Vec<String>, Vec<DocumentChunk>) {
        (mem::take(&mut self.texts), mem::take(&mut self.docs))
    }
}

/// What has been flushed so far: `documents[i]` belongs to handle `i`.
#[derive(Default)]
struct BuildState {
    index: Option<UsearchIndex>,
    documents: Vec<DocumentChunk>,
}

impl BuildState {
    /// The index is created lazily because the model dimension is only
    /// known once the first batch has been embedded.
    fn index_for(&mut self, dim: usize) -> Result<&mut UsearchIndex> {
        if self.index.is_none() {
            self.index = Some(UsearchIndex::new(dim)?);
            tracing::info!("Initialized vector index (dim={})", dim);
        }
        self.index
            .as_mut()
            .ok_or_else(|| Error::IndexEngine("vector index was not initialized".into()))
    }
}

pub struct IndexBuilder<'a> {
    embedder: &'a dyn Embedder,
    options: BuildOptions,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(embedder: &'a dyn Embedder, options: BuildOptions) -> Self {
        Self { embedder, options }
    }

    /// Rebuild the index for `root` at `index_dir`, replacing whatever was there.
    pub fn build(&self, root: &Path, index_dir: &Path) -> Result<BuildSummary> {
        if !root.exists() {
            return Err(Error::RootNotFound(root.to_path_buf()));
        }
        if index_dir.exists() {
            ensure_outside_root(root, index_dir)?;
            tracing::warn!("Removing old index at: {}", index_dir.display());
            fs::remove_dir_all(index_dir)?;
        }

        tracing::info!("Indexing source root: {}", root.display());
        tracing::info!("Discovering source files...");
        let files = discover_files(root, &self.options.discovery);
        tracing::info!("Found {} source files", files.len());

        let (state, files_skipped) = self.ingest(&files)?;
        let Some(index) = state.index else {
            return Err(Error::EmptyCorpus(root.to_path_buf()));
        };

        let metadata = IndexMetadata {
            model: self.embedder.model_name().to_string(),
            embedding_dim: index.dim(),
            chunk_chars: self.options.chunk_chars,
            overlap_lines: self.options.overlap_lines,
            indexed_at: chrono::Utc::now().timestamp(),
            documents: state.documents,
        };
        tracing::info!("Saving index to: {}", index_dir.display());
        persist(index_dir, &index, &metadata)?;

        Ok(BuildSummary {
            files_seen: files.len(),
            files_skipped,
            chunks: metadata.documents.len(),
            embedding_dim: metadata.embedding_dim,
            index_dir: index_dir.to_path_buf(),
        })
    }

    /// Chunk and embed `files` in order. Unreadable files are skipped and
    /// counted; embedding and index failures abort.
    fn ingest(&self, files: &[SourceFile]) -> Result<(BuildState, usize)> {
        let pb = self.progress_bar(files.len());
        let mut batch = Batch::default();
        let mut state = BuildState::default();
        let mut files_skipped = 0usize;

        for file in files {
            pb.inc(1);
            let (text, mtime) = match read_source(&file.absolute) {
                Ok(source) => source,
                Err(e) => {
                    tracing::warn!("Could not read {}: {}", file.relative.display(), e);
                    files_skipped += 1;
                    continue;
                }
            };
            let path = file.relative.to_string_lossy().into_owned();
            let lines = split_lines(&text);
            for span in chunk_lines(&lines, self.options.chunk_chars, self.options.overlap_lines) {
                batch.push(DocumentChunk {
                    path: path.clone(),
                    start_line: span.start_line,
                    end_line: span.end_line,
                    content: span.text,
                    mtime,
                });
                if batch.len() >= self.options.batch_size {
                    self.flush(&mut batch, &mut state)?;
                    let indexed = state.index.as_ref().map_or(0, VectorIndex::len);
                    tracing::info!("Processed {} chunks, index size: {}", state.documents.len(), indexed);
                }
            }
        }
        pb.finish_and_clear();

        if !batch.is_empty() {
            tracing::info!("Encoding final batch...");
            self.flush(&mut batch, &mut state)?;
        }
        Ok((state, files_skipped))
    }

    /// Embed the pending batch and append it to the index and document list.
    fn flush(&self, batch: &mut Batch, state: &mut BuildState) -> Result<()> {
        let (texts, docs) = batch.take();
        if texts.is_empty() {
            return Ok(());
        }
        let mut vectors = self.embedder.embed_batch(&texts)?;
        if vectors.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "model returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        for v in &mut vectors {
            l2_normalize(v);
        }

        let dim = state.index.as_ref().map_or(vectors[0].len(), VectorIndex::dim);
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(Error::Embedding(format!(
                "model returned a {}-dimensional vector, index expects {}",
                bad.len(),
                dim
            )));
        }
        state.index_for(dim)?.add(&vectors)?;
        state.documents.extend(docs);
        debug_assert_eq!(state.index.as_ref().map_or(0, VectorIndex::len), state.documents.len());
        Ok(())
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%)",
        )
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }
}

/// Refuse to wipe an index directory that contains the source root.
fn ensure_outside_root(root: &Path, index_dir: &Path) -> Result<()> {
    let root = fs::canonicalize(root)?;
    let index_dir = fs::canonicalize(index_dir)?;
    if root.starts_with(&index_dir) {
        return Err(Error::InvalidConfig(format!(
            "index directory {} contains the source root {}; refusing to delete it",
            index_dir.display(),
            root.display()
        )));
    }
    Ok(())
}

/// Lossy UTF-8 text of the file and its modification time in epoch seconds.
fn read_source(path: &Path) -> std::io::Result<(String, f64)> {
    let bytes = fs::read(path)?;
    let mtime = fs::metadata(path)?
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64());
    Ok((String::from_utf8_lossy(&bytes).into_owned(), mtime))
}

/// Write both artifacts into a sibling staging directory, then rename it
/// onto `index_dir`.
fn persist(index_dir: &Path, index: &UsearchIndex, metadata: &IndexMetadata) -> Result<()> {
    let parent = index_dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let staging = tempfile::Builder::new().prefix(".semdex-staging-").tempdir_in(parent)?;

    index.save(&staging.path().join(INDEX_FILE))?;
    write_metadata(&staging.path().join(METADATA_FILE), metadata)?;

    if index_dir.exists() {
        fs::remove_dir_all(index_dir)?;
    }
    fs::rename(staging.path(), index_dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingEmbedder {
        dim: usize,
        calls: std::sync::Mutex<Vec<usize>>,
    }

    impl Embedder for CountingEmbedder {
        fn model_name(&self) -> &str {
            "counting"
        }
        fn dim(&self) -> usize {
            self.dim
        }
        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.lock().unwrap().push(texts.len());
            Ok(texts.iter().map(|t| vec![t.len() as f32 + 1.0; self.dim]).collect())
        }
    }

    fn doc(n: usize) -> DocumentChunk {
        DocumentChunk { path: "a.rs".into(), start_line: n, end_line: n + 1, content: format!("line {n}"), mtime: 0.0 }
    }

    #[test]
    fn flush_aligns_documents_with_handles_and_normalizes() {
        let embedder = CountingEmbedder { dim: 3, calls: Default::default() };
        let builder = IndexBuilder::new(&embedder, BuildOptions::default());
        let mut batch = Batch::default();
        let mut state = BuildState::default();
        for n in 1..=3 {
            batch.push(doc(n));
        }
        builder.flush(&mut batch, &mut state).unwrap();
        batch.push(doc(4));
        builder.flush(&mut batch, &mut state).unwrap();

        assert!(batch.is_empty());
        assert_eq!(*embedder.calls.lock().unwrap(), vec![3, 1]);
        let index = state.index.as_ref().unwrap();
        assert_eq!(index.len(), 4);
        assert_eq!(index.dim(), 3);
        assert_eq!(state.documents.iter().map(|d| d.start_line).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn empty_flush_does_not_call_the_model() {
        let embedder = CountingEmbedder { dim: 3, calls: Default::default() };
        let builder = IndexBuilder::new(&embedder, BuildOptions::default());
        let mut state = BuildState::default();
        builder.flush(&mut Batch::default(), &mut state).unwrap();
        assert!(embedder.calls.lock().unwrap().is_empty());
        assert!(state.index.is_none());
    }

    struct ShortEmbedder;

    impl Embedder for ShortEmbedder {
        fn model_name(&self) -> &str {
            "short"
        }
        fn dim(&self) -> usize {
            2
        }
        fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0, 0.0]])
        }
    }

    #[test]
    fn vector_count_mismatch_is_an_embedding_error() {
        let builder = IndexBuilder::new(&ShortEmbedder, BuildOptions::default());
        let mut batch = Batch::default();
        batch.push(doc(1));
        batch.push(doc(2));
        let result = builder.flush(&mut batch, &mut BuildState::default());
        assert!(matches!(result, Err(Error::Embedding(_))));
    }

    struct GrowingEmbedder {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl Embedder for GrowingEmbedder {
        fn model_name(&self) -> &str {
            "growing"
        }
        fn dim(&self) -> usize {
            2
        }
        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(texts.iter().map(|_| vec![1.0; 2 + call]).collect())
        }
    }

    #[test]
    fn dimension_change_between_flushes_is_an_embedding_error() {
        let embedder = GrowingEmbedder { calls: Default::default() };
        let builder = IndexBuilder::new(&embedder, BuildOptions::default());
        let mut state = BuildState::default();
        let mut batch = Batch::default();
        batch.push(doc(1));
        builder.flush(&mut batch, &mut state).unwrap();
        batch.push(doc(2));
        let result = builder.flush(&mut batch, &mut state);
        assert!(matches!(result, Err(Error::Embedding(_))), "{result:?}");
        assert_eq!(state.documents.len(), 1);
    }

    #[test]
    fn read_source_fails_on_missing_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(read_source(&tmp.path().join("gone.rs")).is_err());
    }

    #[test]
    fn unreadable_files_are_skipped_and_counted() {
        let tmp = tempfile::TempDir::new().unwrap();
        let present = tmp.path().join("present.rs");
        fs::write(&present, "fn present() {}\n").unwrap();
        let files = vec![
            SourceFile { relative: PathBuf::from("gone.rs"), absolute: tmp.path().join("gone.rs") },
            SourceFile { relative: PathBuf::from("present.rs"), absolute: present },
        ];

        let embedder = CountingEmbedder { dim: 3, calls: Default::default() };
        let builder = IndexBuilder::new(&embedder, BuildOptions::default());
        let (state, skipped) = builder.ingest(&files).unwrap();

        assert_eq!(skipped, 1);
        assert_eq!(state.documents.len(), 1);
        assert_eq!(state.documents[0].path, "present.rs");
        assert_eq!(state.index.as_ref().map(VectorIndex::len), Some(1));
    }

    #[test]
    fn index_dir_holding_the_root_is_refused() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path().join("src_tree");
        fs::create_dir_all(&root).unwrap();
        assert!(matches!(ensure_outside_root(&root, &root), Err(Error::InvalidConfig(_))));
        assert!(matches!(ensure_outside_root(&root, tmp.path()), Err(Error::InvalidConfig(_))));

        let inside = root.join("index_data");
        fs::create_dir_all(&inside).unwrap();
        assert!(ensure_outside_root(&root, &inside).is_ok());
    }
}
