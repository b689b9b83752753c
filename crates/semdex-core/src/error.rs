use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Index directory not found: {}", .0.display())]
    IndexDirNotFound(PathBuf),

    #[error("Metadata not found: {}", .0.display())]
    MetadataNotFound(PathBuf),

    #[error("Metadata unreadable at {}: {reason}", .path.display())]
    MetadataUnreadable { path: PathBuf, reason: String },

    #[error("Vector index not found: {}", .0.display())]
    IndexNotFound(PathBuf),

    #[error("Index is empty")]
    EmptyIndex,

    #[error("No documents found under {}", .0.display())]
    EmptyCorpus(PathBuf),

    #[error("Embedding dimension mismatch: index expects {expected}, model produced {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector index operation failed: {0}")]
    IndexEngine(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Missing or unusable inputs detected before any real work starts.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::RootNotFound(_)
                | Error::IndexDirNotFound(_)
                | Error::MetadataNotFound(_)
                | Error::MetadataUnreadable { .. }
                | Error::IndexNotFound(_)
                | Error::EmptyIndex
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
