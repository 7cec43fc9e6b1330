//! Common error types used throughout fluxforge.
//!
//! This module provides a unified error type covering the failure cases of a
//! flux rewrite: missing metadata for a referenced segment key, container
//! decode failures, I/O failures, and transform contract violations.

/// Common error type for fluxforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A segment key in the entry stream has no metadata record.
    #[error("No metadata record for segment key {key}")]
    MetaNotFound { key: u32 },

    /// The container bytes do not decode as a flux container.
    #[error("Invalid container: {0}")]
    InvalidContainer(String),

    /// Fewer bytes available than a record requires.
    #[error("Unexpected end of section: need {need} bytes, have {have}")]
    UnexpectedEof { need: usize, have: usize },

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A warp callback violated its contract.
    #[error("Transform rejected at entry {entry}: {detail}")]
    Transform { entry: u64, detail: String },

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new MetaNotFound error.
    pub fn meta_not_found(key: u32) -> Self {
        Self::MetaNotFound { key }
    }

    /// Create a new InvalidContainer error.
    pub fn invalid_container<S: Into<String>>(msg: S) -> Self {
        Self::InvalidContainer(msg.into())
    }

    /// Create a new Transform error.
    pub fn transform<S: Into<String>>(entry: u64, detail: S) -> Self {
        Self::Transform {
            entry,
            detail: detail.into(),
        }
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
