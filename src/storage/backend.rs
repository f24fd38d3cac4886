//! Storage backend trait definition
//!
//! This module defines the core `StorageBackend` trait that both
//! storage implementations (in-memory and relational) implement.

use std::collections::HashMap;

use async_trait::async_trait;

use super::error::StorageResult;
use crate::metric::{Metric, MetricCollection, MetricKind};

/// Outcome of restoring the in-memory collection from its snapshot file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The snapshot was read and replaced the collection
    Restored {
        /// Number of metrics loaded from the snapshot
        metrics: usize,
    },

    /// There is no snapshot to restore from (first run)
    NoPriorState,
}

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: HashMap<String, String>,
}

/// Trait for metric storage backends
///
/// Both backends implement the same update semantics:
///
/// - **Gauge**: the incoming value replaces the stored one
/// - **Counter**: the incoming delta is added to the stored one, or becomes
///   the initial value if the key is new
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync`; HTTP handlers call into the
/// backend concurrently and the backend is responsible for keeping
/// counter accumulation free of lost updates.
///
/// ## Error Handling
///
/// Methods return `StorageResult<T>`. Backend-specific errors (SQL, file
/// I/O) are converted into `StorageError` variants with enough context to
/// tell which operation failed. Deciding whether to retry is left to the
/// caller (see [`crate::repository::Repository`]).
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short backend name used in logs and health output
    fn kind(&self) -> &'static str;

    /// Load the metric stored under `(kind, id)`
    ///
    /// Returns `Ok(None)` if nothing has been stored for that key.
    async fn load(&self, kind: MetricKind, id: &str) -> StorageResult<Option<Metric>>;

    /// Load every stored metric
    async fn load_all(&self) -> StorageResult<MetricCollection>;

    /// Merge a single metric into the store
    ///
    /// Either the whole update is applied or none of it is.
    async fn store_metric(&self, metric: Metric) -> StorageResult<()>;

    /// Merge a list of metrics, in order
    ///
    /// Atomicity across the list is backend-specific: the relational
    /// backend commits the batch as one transaction, the in-memory backend
    /// applies metrics one by one and keeps those applied before a failure.
    async fn store_metrics(&self, metrics: Vec<Metric>) -> StorageResult<()>;

    /// Replace the stored state with the contents of the snapshot file
    async fn restore_from_file(&self) -> StorageResult<RestoreOutcome>;

    /// Write the full stored state to the snapshot file
    async fn write_to_file(&self) -> StorageResult<()>;

    /// Check backend health
    ///
    /// Performs a lightweight operation to verify the backend
    /// is operational (e.g., ping database).
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}
