//! In-memory storage backend with file snapshots
//!
//! This backend keeps the current value of every metric in a single map.
//! It's useful for:
//! - Deployments without a database
//! - Testing without database dependencies
//!
//! ## Persistence
//!
//! The map can be checkpointed to a JSON snapshot file and restored from it
//! on startup. Two modes are supported:
//!
//! - **Periodic**: a ticker (see [`crate::actors::snapshot`]) calls
//!   `write_to_file` on an interval
//! - **Write-through**: with a zero interval, every successful store
//!   rewrites the snapshot before the lock is released
//!
//! Without a snapshot path the backend is purely in-memory.
//!
//! ## Locking
//!
//! One reader/writer lock guards the whole map. Update rates are in the
//! seconds range, so per-key locking is not worth its complexity.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, trace};

use super::backend::{HealthStatus, RestoreOutcome, StorageBackend};
use super::error::{StorageError, StorageResult};
use crate::metric::{Metric, MetricCollection, MetricKind};

/// Snapshot settings for the in-memory backend
#[derive(Debug, Clone, Default)]
pub struct SnapshotConfig {
    /// Snapshot file; `None` disables file persistence
    pub path: Option<PathBuf>,

    /// Interval of the periodic checkpoint; zero selects write-through
    pub interval: Duration,
}

impl SnapshotConfig {
    pub fn write_through(&self) -> bool {
        self.path.is_some() && self.interval.is_zero()
    }
}

/// In-memory storage backend
pub struct MemoryBackend {
    metrics: RwLock<MetricCollection>,
    snapshot: SnapshotConfig,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new(snapshot: SnapshotConfig) -> Self {
        debug!(
            "creating in-memory backend (snapshot: {:?}, write-through: {})",
            snapshot.path,
            snapshot.write_through()
        );

        Self {
            metrics: RwLock::new(MetricCollection::new()),
            snapshot,
        }
    }

    /// Create a backend without any file persistence
    pub fn volatile() -> Self {
        Self::new(SnapshotConfig::default())
    }

    pub fn snapshot_config(&self) -> &SnapshotConfig {
        &self.snapshot
    }

    /// Serialize `metrics` and replace the snapshot file with it
    async fn write_snapshot(path: &Path, metrics: &MetricCollection) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(metrics)?;

        tokio::fs::write(path, &bytes)
            .await
            .map_err(|e| StorageError::snapshot_io("write", path, e))?;

        trace!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::volatile()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, kind: MetricKind, id: &str) -> StorageResult<Option<Metric>> {
        let metrics = self.metrics.read().await;
        let metric = metrics.get(kind, id).cloned();

        if metric.is_none() {
            trace!("metric {kind}/{id} not found in memory");
        }

        Ok(metric)
    }

    async fn load_all(&self) -> StorageResult<MetricCollection> {
        Ok(self.metrics.read().await.clone())
    }

    #[instrument(skip(self, metric), fields(kind = %metric.kind(), id = %metric.id))]
    async fn store_metric(&self, metric: Metric) -> StorageResult<()> {
        metric.validate()?;

        let mut metrics = self.metrics.write().await;
        metrics.apply(metric);

        if self.snapshot.write_through()
            && let Some(path) = &self.snapshot.path
        {
            // The update is already applied: report it as stored even if the
            // checkpoint fails, since a retry would add a counter delta twice.
            if let Err(e) = Self::write_snapshot(path, &metrics).await {
                error!("write-through snapshot failed: {e}");
            }
        }

        Ok(())
    }

    async fn store_metrics(&self, metrics: Vec<Metric>) -> StorageResult<()> {
        debug!("storing {} metrics in memory", metrics.len());

        for metric in metrics {
            self.store_metric(metric).await?;
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn restore_from_file(&self) -> StorageResult<RestoreOutcome> {
        let Some(path) = &self.snapshot.path else {
            debug!("no snapshot path configured, nothing to restore");
            return Ok(RestoreOutcome::NoPriorState);
        };

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("no snapshot at {}, starting empty", path.display());
                return Ok(RestoreOutcome::NoPriorState);
            }
            Err(e) => return Err(StorageError::snapshot_io("read", path, e)),
        };

        let restored: MetricCollection = serde_json::from_slice(&bytes).map_err(|e| {
            StorageError::SerializationError(format!(
                "failed to parse snapshot {}: {}",
                path.display(),
                e
            ))
        })?;

        if let Some((kind, id, metric)) = restored.misplaced() {
            return Err(StorageError::SerializationError(format!(
                "snapshot {} files {} metric {:?} under {kind}/{id:?}",
                path.display(),
                metric.kind(),
                metric.id
            )));
        }

        let count = restored.len();
        *self.metrics.write().await = restored;

        info!("restored {} metrics from {}", count, path.display());
        Ok(RestoreOutcome::Restored { metrics: count })
    }

    #[instrument(skip(self))]
    async fn write_to_file(&self) -> StorageResult<()> {
        let Some(path) = &self.snapshot.path else {
            trace!("no snapshot path configured, skipping write");
            return Ok(());
        };

        let metrics = self.metrics.read().await;
        Self::write_snapshot(path, &metrics).await?;

        debug!("snapshot of {} metrics written to {}", metrics.len(), path.display());
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let mut metadata = HashMap::from([
            ("backend".to_string(), "memory".to_string()),
            (
                "total_metrics".to_string(),
                self.metrics.read().await.len().to_string(),
            ),
        ]);

        if let Some(path) = &self.snapshot.path {
            metadata.insert("snapshot".to_string(), path.display().to_string());
        }

        Ok(HealthStatus {
            healthy: true,
            message: "In-memory storage operational".to_string(),
            metadata,
        })
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory backend (no-op)");
        Ok(())
    }
}
