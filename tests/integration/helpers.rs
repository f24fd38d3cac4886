//! Helper functions for integration tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tally::metric::Metric;
use tally::monitors::Sampler;
use tally::storage::{MemoryBackend, SnapshotConfig, StorageBackend};
use tally::{Repository, RetryPolicy};

/// Sampler producing one gauge that grows by one per poll
pub struct CountingSampler {
    pub reading: f64,
}

impl Sampler for CountingSampler {
    fn sample(&mut self) -> Vec<Metric> {
        self.reading += 1.0;
        vec![Metric::gauge("Reading", self.reading)]
    }
}

pub fn snapshot_backend(path: &Path, interval: Duration) -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::new(SnapshotConfig {
        path: Some(path.to_path_buf()),
        interval,
    }))
}

pub fn repository(backend: Arc<dyn StorageBackend>) -> Arc<Repository> {
    Arc::new(Repository::with_retry_policy(
        backend,
        RetryPolicy::new([Duration::from_millis(1)]),
    ))
}

pub fn sqlite_dsn(path: &Path) -> String {
    format!("sqlite://{}?mode=rwc", path.display())
}

#[cfg(feature = "api")]
pub mod server {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use tally::api::{ApiConfig, ApiState, spawn_api_server};
    use tally::signature::SignatureKey;
    use tally::Repository;
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;

    /// A running API server bound to an ephemeral port
    pub struct TestServer {
        pub addr: SocketAddr,
        pub repository: Arc<Repository>,
        stop: Option<oneshot::Sender<()>>,
        handle: Option<JoinHandle<()>>,
    }

    impl TestServer {
        pub async fn start(repository: Arc<Repository>, key: Option<&str>) -> Self {
            let (stop_tx, stop_rx) = oneshot::channel::<()>();
            let state = ApiState::new(
                repository.clone(),
                key.map(|k| SignatureKey::new(k).unwrap()),
            );

            let (addr, handle) = spawn_api_server(
                ApiConfig {
                    bind_addr: "127.0.0.1:0".to_string(),
                },
                state,
                async move {
                    stop_rx.await.ok();
                },
            )
            .await
            .unwrap();

            Self {
                addr,
                repository,
                stop: Some(stop_tx),
                handle: Some(handle),
            }
        }

        pub fn url(&self, path: &str) -> String {
            format!("http://{}{}", self.addr, path)
        }

        pub async fn stop(mut self) {
            if let Some(stop) = self.stop.take() {
                stop.send(()).ok();
            }
            if let Some(handle) = self.handle.take() {
                handle.await.unwrap();
            }
        }
    }
}
