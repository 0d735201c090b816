//! Error types for the store.

use crate::codec::CodecError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Cannot access path \"{}\"", .path.display())]
    AccessDenied { path: PathBuf },

    #[error("Store file \"{}\" is not empty and could not be decoded: {source}", .path.display())]
    CorruptStore {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("IO error on \"{}\": {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Encode error: {0}")]
    Encode(#[source] CodecError),

    #[error("Value under key \"{key}\" has an unexpected shape: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The detached writer thread has exited, which only happens if it
    /// panicked while applying a write.
    #[error("Background writer is no longer running")]
    WriterClosed,
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
