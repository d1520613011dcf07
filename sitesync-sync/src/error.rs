//! Error types for sitesync-sync.
//!
//! [`SyncError`] is pass-level and reaches the caller of a full pass.
//! [`DocumentError`] never leaves the orchestrator: it is logged and folded
//! into a [`crate::DocumentOutcome`].

use std::path::PathBuf;

use thiserror::Error;

use sitesync_core::ConfigError;
use sitesync_record::{RecordError, ValidationIssues};

/// Errors that abort a whole pass (the content source itself is unusable).
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An error from the configuration layer.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("record store setup failed: {0}")]
    Store(String),
}

/// Failures of a single `put` against the remote store.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The request never produced an HTTP response (DNS, TLS, timeout…).
    #[error("transport error: {0}")]
    Transport(String),

    /// The store answered with a non-success status.
    #[error("store rejected record (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    /// Record could not be encoded for the request body.
    #[error("record JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Anything that stops one document from being published.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("read failed: {0}")]
    Read(#[source] SyncError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationIssues),

    #[error("record error: {0}")]
    Record(#[from] RecordError),

    #[error("record encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
