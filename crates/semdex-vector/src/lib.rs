//! On-disk index: the usearch vector store, the JSON metadata store that
//! maps vector handles back to chunks, the batch builder and the query engine.

pub mod index;
pub mod metadata;
pub mod search;
pub mod writer;

pub use index::{UsearchIndex, INDEX_FILE};
pub use metadata::{read_metadata, write_metadata, METADATA_FILE};
pub use search::{format_result, preview, QueryEngine, PREVIEW_CHARS};
pub use writer::{BuildOptions, BuildSummary, IndexBuilder};
