//! Service layer between the HTTP handlers and the storage backend
//!
//! The repository owns the retry policy: transient storage failures
//! (connection drops, lock contention, file I/O) are retried on a fixed
//! schedule, everything else is reported immediately.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use crate::metric::{Metric, MetricCollection, MetricKind};
use crate::storage::{HealthStatus, StorageBackend, StorageResult};

pub mod error;

pub use error::{ServiceError, ServiceResult};

/// Delays between attempts of a storage operation
///
/// The operation is attempted once, then once more after each delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl RetryPolicy {
    pub fn new(delays: impl Into<Vec<Duration>>) -> Self {
        Self {
            delays: delays.into(),
        }
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self::new(Vec::new())
    }

    pub fn max_attempts(&self) -> usize {
        self.delays.len() + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new([
            Duration::from_secs(1),
            Duration::from_secs(3),
            Duration::from_secs(5),
        ])
    }
}

/// Metric repository
pub struct Repository {
    backend: Arc<dyn StorageBackend>,
    retry: RetryPolicy,
}

impl Repository {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_retry_policy(backend, RetryPolicy::default())
    }

    pub fn with_retry_policy(backend: Arc<dyn StorageBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Run `op` until it succeeds, fails permanently or runs out of retries
    async fn retrying<T, F, Fut>(&self, mut op: F) -> StorageResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StorageResult<T>>,
    {
        let mut delays = self.retry.delays.iter();
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => match delays.next() {
                    Some(delay) => {
                        warn!(
                            "attempt {}/{} failed: {}, retrying in {:?}",
                            attempt,
                            self.retry.max_attempts(),
                            e,
                            delay
                        );
                        tokio::time::sleep(*delay).await;
                        attempt += 1;
                    }
                    None => {
                        error!("giving up after {} attempts: {}", attempt, e);
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }

    /// Merge a single metric into storage
    #[instrument(skip(self, metric), fields(kind = %metric.kind(), id = %metric.id))]
    pub async fn save_metric(&self, metric: Metric) -> ServiceResult<()> {
        metric.validate()?;

        let result = self
            .retrying(|| {
                let backend = self.backend.clone();
                let metric = metric.clone();
                async move { backend.store_metric(metric).await }
            })
            .await;

        match result {
            Ok(()) => {
                info!("metric is stored");
                Ok(())
            }
            Err(e) => {
                error!("failed to store metric: {e}");
                Err(e.into())
            }
        }
    }

    /// Merge a list of metrics into storage
    #[instrument(skip(self, metrics), fields(count = metrics.len()))]
    pub async fn save_metrics(&self, metrics: Vec<Metric>) -> ServiceResult<()> {
        let result = self
            .retrying(|| {
                let backend = self.backend.clone();
                let metrics = metrics.clone();
                async move { backend.store_metrics(metrics).await }
            })
            .await;

        match result {
            Ok(()) => {
                info!("metrics are stored");
                Ok(())
            }
            Err(e) => {
                error!("failed to store metrics: {e}");
                Err(e.into())
            }
        }
    }

    /// Current value of `(kind, id)`
    #[instrument(skip(self))]
    pub async fn get_metric(&self, kind: MetricKind, id: &str) -> ServiceResult<Metric> {
        let metric = self
            .retrying(|| self.backend.load(kind, id))
            .await?
            .ok_or_else(|| ServiceError::NotFound {
                kind,
                id: id.to_string(),
            })?;

        debug!("loaded metric {}", metric.value);
        Ok(metric)
    }

    /// Every stored metric
    #[instrument(skip(self))]
    pub async fn get_metrics(&self) -> ServiceResult<MetricCollection> {
        let metrics = self.retrying(|| self.backend.load_all()).await?;
        debug!("loaded {} metrics", metrics.len());
        Ok(metrics)
    }

    /// Health of the underlying backend
    pub async fn ping(&self) -> ServiceResult<HealthStatus> {
        let status = self.backend.health_check().await?;
        if !status.healthy {
            warn!("{} backend unhealthy: {}", self.backend.kind(), status.message);
        }
        Ok(status)
    }
}
