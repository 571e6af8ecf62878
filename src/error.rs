//! Error types for the ingestion pipeline and the position store.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The archive could not be opened at all (bad central directory, not a zip, ...).
    #[error("cannot open archive '{name}': {source}")]
    Archive {
        name: String,
        source: zip::result::ZipError,
    },

    /// A single member of an otherwise readable archive failed to decompress.
    #[error("cannot read '{member}' in '{archive}': {source}")]
    Member {
        archive: String,
        member: String,
        source: io::Error,
    },

    #[error("cannot write reading positions to {path}: {source}")]
    State {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
