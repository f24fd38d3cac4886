//! Errors surfaced by the repository to its callers

use std::fmt;

use crate::metric::{MetricError, MetricKind};
use crate::storage::StorageError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Outcome categories the HTTP layer maps onto status codes
#[derive(Debug)]
pub enum ServiceError {
    /// Nothing is stored under `(kind, id)`
    NotFound { kind: MetricKind, id: String },

    /// The metric was rejected before it reached storage
    InvalidMetric(MetricError),

    /// Storage kept failing (after retries, for transient errors)
    StoreFailed(StorageError),

    /// The backend does not implement the requested operation
    Unsupported(&'static str),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::NotFound { kind, id } => write!(f, "{kind} metric {id:?} not found"),
            ServiceError::InvalidMetric(err) => write!(f, "{err}"),
            ServiceError::StoreFailed(err) => write!(f, "failed to store data: {err}"),
            ServiceError::Unsupported(what) => write!(f, "{what} is not supported"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::InvalidMetric(err) => Some(err),
            ServiceError::StoreFailed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MetricError> for ServiceError {
    fn from(err: MetricError) -> Self {
        ServiceError::InvalidMetric(err)
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidMetric(err) => ServiceError::InvalidMetric(err),
            StorageError::Unsupported(what) => ServiceError::Unsupported(what),
            other => ServiceError::StoreFailed(other),
        }
    }
}
