//! Storage backends for metric persistence
//!
//! This module provides a trait-based abstraction over the two places the
//! server can keep metrics.
//!
//! ## Backends
//!
//! - **In-Memory** (default): a single map, optionally checkpointed to a
//!   JSON snapshot file
//! - **SQL** (`storage-sql` feature): one row per metric in PostgreSQL or
//!   SQLite
//!
//! ## Usage
//!
//! ```no_run
//! use tally::storage::{StorageConfig, open_backend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = open_backend(&StorageConfig::default()).await?;
//!     // Hand to the Repository and the SnapshotActor
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tracing::info;

pub mod backend;
pub mod error;
pub mod memory;
#[cfg(feature = "storage-sql")]
pub mod sql;

pub use backend::{HealthStatus, RestoreOutcome, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use memory::{MemoryBackend, SnapshotConfig};

/// Everything needed to pick and prepare a backend
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// Database connection string; selects the SQL backend when set
    pub database_dsn: Option<String>,

    /// Snapshot settings for the in-memory backend
    pub snapshot: SnapshotConfig,

    /// Load the snapshot file into the in-memory backend on startup
    pub restore: bool,
}

/// Open the backend selected by `config`
///
/// A configured DSN selects the SQL backend, otherwise metrics are kept in
/// memory. For the in-memory backend the snapshot is restored first when
/// `config.restore` is set.
pub async fn open_backend(config: &StorageConfig) -> StorageResult<Arc<dyn StorageBackend>> {
    if let Some(dsn) = config.database_dsn.as_deref().filter(|dsn| !dsn.is_empty()) {
        return open_sql(dsn).await;
    }

    let backend = MemoryBackend::new(config.snapshot.clone());

    if config.restore {
        match backend.restore_from_file().await? {
            RestoreOutcome::Restored { metrics } => {
                info!("restored {metrics} metrics from snapshot");
            }
            RestoreOutcome::NoPriorState => info!("no prior state, starting empty"),
        }
    }

    Ok(Arc::new(backend))
}

#[cfg(feature = "storage-sql")]
async fn open_sql(dsn: &str) -> StorageResult<Arc<dyn StorageBackend>> {
    Ok(Arc::new(sql::SqlBackend::connect(dsn).await?))
}

#[cfg(not(feature = "storage-sql"))]
async fn open_sql(_dsn: &str) -> StorageResult<Arc<dyn StorageBackend>> {
    Err(StorageError::InvalidConfig(
        "a database DSN was given but SQL support is not compiled in".to_string(),
    ))
}
