//! Error types for storage operations

use std::fmt;
use std::path::Path;

use crate::metric::MetricError;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations
#[derive(Debug)]
pub enum StorageError {
    /// Database connection failed
    ConnectionFailed(String),

    /// Database query failed
    QueryFailed(String),

    /// Migration failed
    MigrationFailed(String),

    /// Invalid configuration
    InvalidConfig(String),

    /// Metric or snapshot serialization/deserialization error
    SerializationError(String),

    /// I/O error while accessing the snapshot file
    Io {
        context: String,
        source: std::io::Error,
    },

    /// The metric violates the value model and was not applied
    InvalidMetric(MetricError),

    /// The operation does not exist for this backend
    Unsupported(&'static str),
}

impl StorageError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn snapshot_io(action: &str, path: &Path, source: std::io::Error) -> Self {
        Self::io(format!("failed to {action} snapshot {}", path.display()), source)
    }

    /// Whether retrying the same operation may succeed
    ///
    /// Connection hiccups, failed queries (including constraint violations
    /// from racing writers) and file I/O errors are transient. Invalid
    /// metrics and unsupported operations fail the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::ConnectionFailed(_) | StorageError::QueryFailed(_) | StorageError::Io { .. }
        )
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ConnectionFailed(msg) => {
                write!(f, "failed to connect to storage backend: {}", msg)
            }
            StorageError::QueryFailed(msg) => write!(f, "storage query failed: {}", msg),
            StorageError::MigrationFailed(msg) => write!(f, "database migration failed: {}", msg),
            StorageError::InvalidConfig(msg) => write!(f, "invalid storage configuration: {}", msg),
            StorageError::SerializationError(msg) => {
                write!(f, "metric serialization error: {}", msg)
            }
            StorageError::Io { context, source } => write!(f, "{}: {}", context, source),
            StorageError::InvalidMetric(err) => write!(f, "invalid metric: {}", err),
            StorageError::Unsupported(what) => {
                write!(f, "{} is not supported by this storage backend", what)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io { source, .. } => Some(source),
            StorageError::InvalidMetric(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MetricError> for StorageError {
    fn from(err: MetricError) -> Self {
        StorageError::InvalidMetric(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

#[cfg(feature = "storage-sql")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(io_err) => StorageError::io("database I/O failed", io_err),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StorageError::ConnectionFailed(err.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StorageError::SerializationError(err.to_string())
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

#[cfg(feature = "storage-sql")]
impl From<sqlx::migrate::MigrateError> for StorageError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StorageError::MigrationFailed(err.to_string())
    }
}
