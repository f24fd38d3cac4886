//! End-to-end tests: collector and reporter actors against a live server

use std::sync::Arc;
use std::time::Duration;

use tally::actors::{Backoff, CollectorHandle, ReporterConfig, ReporterHandle};
use tally::metric::{Metric, MetricKind};
use tally::signature::SignatureKey;
use tally::storage::MemoryBackend;

use crate::helpers::server::TestServer;
use crate::helpers::{CountingSampler, repository};

fn agent(server: &TestServer, key: Option<&str>) -> (CollectorHandle, ReporterHandle) {
    let collector = CollectorHandle::spawn(CountingSampler { reading: 0.0 }, Duration::from_secs(3600));
    let reporter = ReporterHandle::spawn(
        collector.clone(),
        ReporterConfig {
            address: server.addr.to_string(),
            report_interval: Duration::from_secs(3600),
            key: key.map(|k| SignatureKey::new(k).unwrap()),
            backoff: Backoff::none(),
        },
    )
    .unwrap();

    (collector, reporter)
}

#[tokio::test]
async fn test_agent_reports_to_server() {
    let server = TestServer::start(repository(Arc::new(MemoryBackend::volatile())), None).await;
    let (collector, reporter) = agent(&server, None);

    for _ in 0..3 {
        collector.poll_now().await.unwrap();
    }
    assert_eq!(reporter.report_now().await.unwrap(), 2);

    let repo = server.repository.clone();
    assert_eq!(
        repo.get_metric(MetricKind::Counter, "PollCount").await.unwrap(),
        Metric::counter("PollCount", 3)
    );
    assert_eq!(
        repo.get_metric(MetricKind::Gauge, "Reading").await.unwrap(),
        Metric::gauge("Reading", 3.0)
    );

    // Later reports add to the counter and replace the gauge
    collector.poll_now().await.unwrap();
    collector.poll_now().await.unwrap();
    reporter.report_now().await.unwrap();

    assert_eq!(
        repo.get_metric(MetricKind::Counter, "PollCount").await.unwrap(),
        Metric::counter("PollCount", 5)
    );
    assert_eq!(
        repo.get_metric(MetricKind::Gauge, "Reading").await.unwrap(),
        Metric::gauge("Reading", 5.0)
    );

    reporter.shutdown().await.unwrap();
    collector.shutdown().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn test_signed_agent_accepted() {
    let server = TestServer::start(
        repository(Arc::new(MemoryBackend::volatile())),
        Some("shared"),
    )
    .await;
    let (collector, reporter) = agent(&server, Some("shared"));

    collector.poll_now().await.unwrap();
    reporter.report_now().await.unwrap();

    assert_eq!(
        server
            .repository
            .get_metric(MetricKind::Counter, "PollCount")
            .await
            .unwrap(),
        Metric::counter("PollCount", 1)
    );

    server.stop().await;
}

#[tokio::test]
async fn test_wrong_key_rejected_and_polls_kept() {
    let server = TestServer::start(
        repository(Arc::new(MemoryBackend::volatile())),
        Some("shared"),
    )
    .await;
    let (collector, reporter) = agent(&server, Some("other"));

    collector.poll_now().await.unwrap();
    collector.poll_now().await.unwrap();
    assert!(reporter.report_now().await.is_err());

    assert!(server.repository.get_metrics().await.unwrap().is_empty());

    let batch = collector.take_batch().await.unwrap();
    assert!(batch.contains(&Metric::counter("PollCount", 2)));

    server.stop().await;
}

#[tokio::test]
async fn test_reporter_timer_delivers() {
    let server = TestServer::start(repository(Arc::new(MemoryBackend::volatile())), None).await;

    let collector = CollectorHandle::spawn(CountingSampler { reading: 0.0 }, Duration::from_millis(10));
    let reporter = ReporterHandle::spawn(
        collector.clone(),
        ReporterConfig {
            address: server.addr.to_string(),
            report_interval: Duration::from_millis(50),
            key: None,
            backoff: Backoff::none(),
        },
    )
    .unwrap();

    let mut delivered = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if server
            .repository
            .get_metric(MetricKind::Counter, "PollCount")
            .await
            .is_ok()
        {
            delivered = true;
            break;
        }
    }
    assert!(delivered, "no report arrived");

    reporter.shutdown().await.unwrap();
    collector.shutdown().await.unwrap();
    server.stop().await;
}
