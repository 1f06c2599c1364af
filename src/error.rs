//! Error types for LineKV
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using LineKvError
pub type Result<T> = std::result::Result<T, LineKvError>;

/// Unified error type for LineKV operations
#[derive(Debug, Error)]
pub enum LineKvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    /// A line in the store file could not be decoded (line is 1-based)
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Mutation Errors
    // -------------------------------------------------------------------------
    /// A set/remove/clear could not be applied; the original file is untouched
    #[error("Rewrite of {} failed: {source}", .path.display())]
    RewriteFailed {
        path: PathBuf,
        #[source]
        source: Box<LineKvError>,
    },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LineKvError {
    /// Wrap an error as the failure of a mutation against `path`
    pub(crate) fn rewrite_failed(path: impl Into<PathBuf>, source: LineKvError) -> Self {
        LineKvError::RewriteFailed {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through `RewriteFailed`
    pub fn root_cause(&self) -> &LineKvError {
        match self {
            LineKvError::RewriteFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// True if this error (or what it wraps) is a decode failure
    pub fn is_malformed(&self) -> bool {
        matches!(self.root_cause(), LineKvError::MalformedRecord { .. })
    }
}
