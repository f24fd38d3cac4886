//! HTTP API tests against a live server

use std::sync::Arc;

use reqwest::StatusCode;
use tally::api::{HealthResponse, StoredResponse};
use tally::metric::{Metric, MetricKind};
use tally::signature::{SIGNATURE_HEADER, SignatureKey};
use tally::storage::MemoryBackend;

use crate::helpers::repository;
use crate::helpers::server::TestServer;

async fn start(key: Option<&str>) -> TestServer {
    TestServer::start(repository(Arc::new(MemoryBackend::volatile())), key).await
}

#[tokio::test]
async fn test_path_update_then_text_value() {
    let server = start(None).await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/update/gauge/Alloc/12.5"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("Alloc"));

    let response = client
        .get(server.url("/value/gauge/Alloc"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "12.5");

    server.stop().await;
}

#[tokio::test]
async fn test_counter_accumulates_over_http() {
    let server = start(None).await;
    let client = reqwest::Client::new();

    for delta in [1, 2, 3] {
        client
            .post(server.url(&format!("/update/counter/PollCount/{delta}")))
            .send()
            .await
            .unwrap();
    }

    let metric: Metric = client
        .post(server.url("/value/"))
        .json(&serde_json::json!({"id": "PollCount", "type": "counter"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(metric, Metric::counter("PollCount", 6));

    server.stop().await;
}

#[tokio::test]
async fn test_unknown_route_and_bad_value() {
    let server = start(None).await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/update/gauge/Alloc/abc"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .get(server.url("/value/counter/Missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client.get(server.url("/nope")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn test_signed_batch() {
    let server = start(Some("k3y")).await;
    let client = reqwest::Client::new();
    let body = serde_json::to_vec(&vec![
        Metric::gauge("Alloc", 1.0),
        Metric::counter("PollCount", 4),
    ])
    .unwrap();

    let response = client
        .post(server.url("/updates/"))
        .header("content-type", "application/json")
        .body(body.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let signature = SignatureKey::new("k3y").unwrap().sign(&body);
    let response = client
        .post(server.url("/updates/"))
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stored: StoredResponse = response.json().await.unwrap();
    assert_eq!(stored.stored, 2);

    assert_eq!(
        server
            .repository
            .get_metric(MetricKind::Counter, "PollCount")
            .await
            .unwrap(),
        Metric::counter("PollCount", 4)
    );

    server.stop().await;
}

#[tokio::test]
async fn test_index_lists_metrics() {
    let server = start(None).await;
    server
        .repository
        .save_metrics(vec![
            Metric::gauge("Alloc", 2.0),
            Metric::counter("PollCount", 1),
        ])
        .await
        .unwrap();

    let response = reqwest::get(server.url("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/html"));

    let html = response.text().await.unwrap();
    assert!(html.contains("Alloc"));
    assert!(html.contains("PollCount"));

    server.stop().await;
}

#[tokio::test]
async fn test_ping() {
    let server = start(None).await;

    let response = reqwest::get(server.url("/ping")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let health: HealthResponse = response.json().await.unwrap();
    assert_eq!(health.status, "ok");

    server.stop().await;
}

#[tokio::test]
async fn test_gzip_request_body() {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let server = start(None).await;
    let json = serde_json::to_vec(&vec![Metric::counter("PollCount", 2)]).unwrap();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json).unwrap();
    let body = encoder.finish().unwrap();

    let response = reqwest::Client::new()
        .post(server.url("/updates/"))
        .header("content-type", "application/json")
        .header("content-encoding", "gzip")
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        server
            .repository
            .get_metric(MetricKind::Counter, "PollCount")
            .await
            .unwrap(),
        Metric::counter("PollCount", 2)
    );

    server.stop().await;
}
