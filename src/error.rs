//! Error taxonomy for attribute resolution
//!
//! The parser never fails: malformed lines and assignments are skipped, so
//! there is no parse-error variant. Missing rule files are absorbed during
//! collection and only surface as `NotFound` when a specifically requested
//! resource is absent.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the attribute resolution subsystem
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AttrError {
    /// Malformed input at the public surface (bad attribute or macro name,
    /// missing commit id for a commit-sourced lookup, ...)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A specifically requested resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A read failed from a source that was expected to be present
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The caller-supplied cancellation token fired
    #[error("operation cancelled")]
    Cancelled,

    /// The user callback returned a non-zero code, which is carried here
    #[error("callback aborted with code {0}")]
    Callback(i32),
}

impl AttrError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        AttrError::Io {
            path: path.into(),
            source,
        }
    }
}
