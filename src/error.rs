//! Typed domain errors for vinylcrate.
//!
//! Library operations return `Result<T, VinylError>`; the CLI binary converts
//! these into `anyhow::Result` at its boundary. Cancellation is a normal,
//! distinct outcome, not an error condition reported to the user as a failure.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VinylError {
    #[error("{what} not found")]
    NotFound { what: String },

    #[error("a record with file path {path:?} already exists")]
    DuplicateFilePath { path: PathBuf },

    #[error("invalid template: {reason}")]
    InvalidTemplate { reason: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("io error during {op} on {path:?}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("database error during {op}: {source}")]
    Database {
        op: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl VinylError {
    pub fn not_found(what: impl Into<String>) -> Self {
        VinylError::NotFound { what: what.into() }
    }

    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VinylError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn database(op: &'static str, source: sqlx::Error) -> Self {
        // sqlx reports unique-constraint violations as a generic Database
        // error; Catalog::save upgrades those to DuplicateFilePath itself,
        // so by the time a bare Database variant surfaces it really is
        // structural (connection lost, disk full, etc).
        VinylError::Database { op, source }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        VinylError::Internal(msg.into())
    }

    /// True for errors that represent a normal, non-failure termination.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, VinylError::Cancelled)
    }
}

pub type VinylResult<T> = Result<T, VinylError>;
