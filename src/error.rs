// src/error.rs

// Error taxonomy shared by every construction phase.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors returned during GCSA construction.
///
/// Nothing here is retried. The caller is expected to abort the whole run on
/// the first error it sees.
#[derive(Debug, Error)]
pub enum ConstructionError {
    /// A file could not be opened or created.
    #[error("cannot open {}: {source}", path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// I/O error on an already open file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Malformed k-mer record.
    #[error("invalid k-mer record: {0}")]
    Parse(String),
    /// Construction-time invariant violation (overlapping or misordered ranges).
    #[error("invariant violation: {0}")]
    Invariant(String),
}

impl ConstructionError {
    pub fn resource<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        ConstructionError::Resource {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConstructionError>;
