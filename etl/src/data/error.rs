//! Unified error type for data layer
//!
//! Wraps errors from both warehouse backends (Redshift, SQLite) and from the
//! object storage the staging loader reads, preserving which side failed.

use thiserror::Error;

/// Unified error type for data layer operations
#[derive(Error, Debug)]
pub enum DataError {
    /// SQLite statement or connection error
    #[error("SQLite error: {0}")]
    Sqlite(sqlx::Error),

    /// Redshift statement or connection error
    #[error("Redshift error: {0}")]
    Redshift(sqlx::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Object storage request failed
    #[error("Object storage error: {0}")]
    Object(String),

    /// Source location resolved to nothing
    #[error("No objects found at {0}")]
    NotFound(String),

    /// A source record could not be parsed
    #[error("Malformed JSON record {record} in {object}: {error}")]
    MalformedRecord {
        object: String,
        record: usize,
        error: String,
    },

    /// A JSONPaths document or expression is invalid
    #[error("Invalid JSONPaths in {source_name}: {reason}")]
    JsonPaths { source_name: String, reason: String },

    /// A stage ran before the tables it needs existed
    #[error("Stage '{stage}' requires table '{table}', which does not exist")]
    Precondition {
        stage: &'static str,
        table: &'static str,
    },

    /// Operation not available for this backend
    #[error("Not supported on {backend}: {reason}")]
    Unsupported {
        backend: &'static str,
        reason: String,
    },
}

impl DataError {
    /// Create a SQLite error with preserved context
    pub fn from_sqlite(e: sqlx::Error) -> Self {
        Self::Sqlite(e)
    }

    /// Create a Redshift error with preserved context
    pub fn from_redshift(e: sqlx::Error) -> Self {
        Self::Redshift(e)
    }

    /// Create a malformed record error
    pub fn malformed(object: &str, record: usize, error: impl ToString) -> Self {
        Self::MalformedRecord {
            object: object.to_string(),
            record,
            error: error.to_string(),
        }
    }

    /// Create a JSONPaths error
    pub fn jsonpaths(source_name: &str, reason: impl Into<String>) -> Self {
        Self::JsonPaths {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported-operation error
    pub fn unsupported(backend: &'static str, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            backend,
            reason: reason.into(),
        }
    }

    /// Get the backend name if this error is database-specific
    pub fn backend(&self) -> Option<&'static str> {
        match self {
            Self::Sqlite(_) => Some("sqlite"),
            Self::Redshift(_) => Some("redshift"),
            Self::Unsupported { backend, .. } => Some(backend),
            _ => None,
        }
    }
}
