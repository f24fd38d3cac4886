//! Concurrent writers against the repository

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tally::metric::{Metric, MetricKind, MetricValue};
use tally::storage::{MemoryBackend, StorageBackend};

use crate::helpers::{repository, snapshot_backend};

#[tokio::test]
async fn test_concurrent_counter_updates_are_not_lost() {
    let repo = repository(Arc::new(MemoryBackend::volatile()));

    let tasks = (0..100).map(|i| {
        let repo = repo.clone();
        tokio::spawn(async move { repo.save_metric(Metric::counter("Hits", i)).await })
    });
    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    assert_eq!(
        repo.get_metric(MetricKind::Counter, "Hits").await.unwrap(),
        Metric::counter("Hits", (0..100).sum())
    );
}

#[tokio::test]
async fn test_concurrent_batches_and_reads() {
    let repo = repository(Arc::new(MemoryBackend::volatile()));

    let writers = (0..20).map(|i| {
        let repo = repo.clone();
        tokio::spawn(async move {
            repo.save_metrics(vec![
                Metric::counter("PollCount", 1),
                Metric::gauge(format!("Gauge{i}"), i as f64),
            ])
            .await
        })
    });
    let readers = (0..20).map(|_| {
        let repo = repo.clone();
        tokio::spawn(async move { repo.get_metrics().await.map(|metrics| metrics.len()) })
    });

    for result in join_all(writers).await {
        result.unwrap().unwrap();
    }
    for result in join_all(readers).await {
        // A reader sees some consistent prefix of the writes
        assert!(result.unwrap().unwrap() <= 21);
    }

    let metrics = repo.get_metrics().await.unwrap();
    assert_eq!(metrics.len(), 21);
    assert_eq!(
        metrics.get(MetricKind::Counter, "PollCount").map(|m| m.value),
        Some(MetricValue::Counter(20))
    );
}

#[tokio::test]
async fn test_write_through_under_concurrency() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.json");
    let backend = snapshot_backend(&path, Duration::ZERO);
    let repo = repository(backend.clone());

    let tasks = (0..25).map(|_| {
        let repo = repo.clone();
        tokio::spawn(async move { repo.save_metric(Metric::counter("Writes", 1)).await })
    });
    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    // The last snapshot written reflects every update
    let restored = snapshot_backend(&path, Duration::ZERO);
    restored.restore_from_file().await.unwrap();
    assert_eq!(
        restored.load(MetricKind::Counter, "Writes").await.unwrap(),
        Some(Metric::counter("Writes", 25))
    );
}
