//! Error types for blockdocs.
//!
//! Library crates use [`BlockdocsError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all blockdocs operations.
#[derive(Debug, thiserror::Error)]
pub enum BlockdocsError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level failure (connect, timeout, body read).
    #[error("network error: {0}")]
    Network(String),

    /// Remote answered with an unexpected HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Remote kept answering 504 until the attempt budget ran out.
    #[error("gateway timeout after {attempts} attempt(s)")]
    GatewayTimeout { attempts: u32 },

    /// Remote answered 200 but reported a non-zero status code.
    #[error("rejected by remote (code {code}): {message}")]
    Rejected { code: i64, message: String },

    /// Malformed JSON or unexpected shape in a remote response.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid input (bad path, wrong extension, missing ledger entry).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Object-storage upload failure.
    #[error("upload error: {0}")]
    Upload(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlockdocsError>;

impl BlockdocsError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
