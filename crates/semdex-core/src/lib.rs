//! Core building blocks shared by the indexer and the query engine:
//! chunk and metadata types, the error taxonomy, configuration, the
//! collaborator traits, the line chunker and source file discovery.

pub mod chunker;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;
pub mod walker;

pub use error::{Error, Result};
