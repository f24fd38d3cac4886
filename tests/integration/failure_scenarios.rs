//! Failure handling across storage, repository and snapshots

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use tally::actors::SnapshotHandle;
use tally::metric::{Metric, MetricCollection, MetricKind};
use tally::repository::ServiceError;
use tally::storage::{
    HealthStatus, MemoryBackend, RestoreOutcome, SnapshotConfig, StorageBackend, StorageConfig,
    StorageError, StorageResult, open_backend,
};

use crate::helpers::{repository, snapshot_backend};

/// Backend whose writes always fail with a connection error
#[derive(Default)]
struct DownBackend {
    attempts: AtomicUsize,
}

#[async_trait]
impl StorageBackend for DownBackend {
    fn kind(&self) -> &'static str {
        "down"
    }

    async fn load(&self, _kind: MetricKind, _id: &str) -> StorageResult<Option<Metric>> {
        Ok(None)
    }

    async fn load_all(&self) -> StorageResult<MetricCollection> {
        Ok(MetricCollection::new())
    }

    async fn store_metric(&self, _metric: Metric) -> StorageResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::ConnectionFailed("database is gone".to_string()))
    }

    async fn store_metrics(&self, _metrics: Vec<Metric>) -> StorageResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::ConnectionFailed("database is gone".to_string()))
    }

    async fn restore_from_file(&self) -> StorageResult<RestoreOutcome> {
        Err(StorageError::Unsupported("restore_from_file"))
    }

    async fn write_to_file(&self) -> StorageResult<()> {
        Err(StorageError::Unsupported("write_to_file"))
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        Ok(HealthStatus {
            healthy: false,
            message: "database is gone".to_string(),
            metadata: Default::default(),
        })
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_corrupt_snapshot_fails_startup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.json");
    tokio::fs::write(&path, b"{ not a snapshot").await.unwrap();

    let result = open_backend(&StorageConfig {
        database_dsn: None,
        snapshot: SnapshotConfig {
            path: Some(path),
            interval: Duration::from_secs(300),
        },
        restore: true,
    })
    .await;

    assert_matches!(result.err(), Some(StorageError::SerializationError(_)));
}

#[tokio::test]
async fn test_unwritable_snapshot_reported_by_flush() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("metrics.json");

    let backend = snapshot_backend(&path, Duration::from_secs(300));
    let snapshots = SnapshotHandle::spawn(backend.clone(), Duration::from_secs(300));
    repository(backend.clone())
        .save_metric(Metric::gauge("Alloc", 1.0))
        .await
        .unwrap();

    assert!(snapshots.flush().await.is_err());

    // The in-memory state is unaffected
    assert_eq!(
        backend.load(MetricKind::Gauge, "Alloc").await.unwrap(),
        Some(Metric::gauge("Alloc", 1.0))
    );
}

#[tokio::test]
async fn test_repository_gives_up_after_retries() {
    let backend = Arc::new(DownBackend::default());
    let repo = repository(backend.clone());

    let result = repo.save_metric(Metric::counter("PollCount", 1)).await;

    assert_matches!(result, Err(ServiceError::StoreFailed(_)));
    // One attempt plus one retry
    assert_eq!(backend.attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_invalid_metric_never_reaches_backend() {
    let backend = Arc::new(DownBackend::default());
    let repo = repository(backend.clone());

    let result = repo.save_metric(Metric::gauge("", 1.0)).await;

    assert_matches!(result, Err(ServiceError::InvalidMetric(_)));
    assert_eq!(backend.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unhealthy_backend_reported_by_ping() {
    let repo = repository(Arc::new(DownBackend::default()));

    let status = repo.ping().await.unwrap();
    assert!(!status.healthy);
}

#[tokio::test]
async fn test_volatile_store_ignores_snapshots() {
    let backend = MemoryBackend::volatile();
    backend.write_to_file().await.unwrap();
    assert_eq!(
        backend.restore_from_file().await.unwrap(),
        RestoreOutcome::NoPriorState
    );
}

#[cfg(feature = "storage-sql")]
#[tokio::test]
async fn test_sql_batch_rolls_back_on_invalid_metric() {
    let dir = tempfile::tempdir().unwrap();
    let backend = open_backend(&StorageConfig {
        database_dsn: Some(crate::helpers::sqlite_dsn(&dir.path().join("metrics.db"))),
        ..Default::default()
    })
    .await
    .unwrap();

    let result = backend
        .store_metrics(vec![
            Metric::counter("PollCount", 1),
            Metric::gauge("", 2.0),
        ])
        .await;

    assert_matches!(result, Err(StorageError::InvalidMetric(_)));
    assert!(backend.load_all().await.unwrap().is_empty());
}
