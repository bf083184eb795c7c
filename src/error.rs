use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::search::SearchState;

/// Errors that can occur while preparing or running a prefix search
#[derive(Error, Debug)]
pub enum SpoofError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Image codec error on {path:?}: {source}")]
    Codec {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Search cannot run from state {0:?}")]
    InvalidState(SearchState),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),
}

impl SpoofError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SpoofError>;
