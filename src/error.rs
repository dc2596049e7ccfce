//! Typed errors for the corpus-load and refresh paths.
//!
//! Everything else in the crate reports through `anyhow`; these two enums
//! exist because callers branch on them: the server turns a [`CorpusError`]
//! into a 500 response, and the CLI turns [`RefreshError::NoData`] into exit
//! status 2.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to load the backing document into the in-memory corpus.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("failed to read corpus document {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse corpus document {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The background build task panicked or was cancelled.
    #[error("corpus build task failed: {0}")]
    Task(String),
}

/// Failure of a refresh run as a whole. Per-source failures never surface here.
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("no data fetched from any source and no fallback sample available")]
    NoData,

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize refresh artifact: {0}")]
    Serialize(#[from] serde_json::Error),
}
