//! Error types for the file-discovery and output layers.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CpaiError>;

#[derive(Debug, Error)]
pub enum CpaiError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("clipboard unavailable: {0}")]
    Clipboard(#[from] arboard::Error),

    #[error("no files found to process")]
    NoFiles,
}

impl CpaiError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors that end the run without failing it
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::NoFiles)
    }
}
