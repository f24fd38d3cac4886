//! ReporterActor - Ships collected metrics to the server
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → CollectorHandle::take_batch() → POST /updates/ (gzip JSON, signed)
//!                                                   │ failure, after retries
//!                     CollectorHandle::return_polls() ◄┘
//! ```
//!
//! Gauges are resent with every batch anyway, so only the poll counter has
//! to be handed back when a delivery fails. The signature covers the JSON
//! before compression, which is what the server sees after decoding.

use std::fmt;
use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, instrument, trace, warn};

use super::collector::{CollectorHandle, POLL_COUNT};
use super::messages::ReporterCommand;
use crate::metric::{Metric, MetricValue};
use crate::signature::{SIGNATURE_HEADER, SignatureKey};

/// Retry schedule for a batch the server did not take
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Retries after the first attempt
    pub retries: u32,

    /// Delay before the first retry; doubles for every further one
    pub initial: Duration,

    /// Upper bound for a single delay
    pub max: Duration,
}

impl Backoff {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            retries: 0,
            initial: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (zero-based)
    pub fn delay(&self, retry: u32) -> Duration {
        self.initial
            .saturating_mul(2u32.saturating_pow(retry))
            .min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            retries: 3,
            initial: Duration::from_secs(1),
            max: Duration::from_secs(10),
        }
    }
}

/// Settings of the reporter
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Server address as `host:port`
    pub address: String,

    pub report_interval: Duration,

    /// Shared key for body signatures
    pub key: Option<SignatureKey>,

    pub backoff: Backoff,
}

/// Why a single delivery attempt failed
#[derive(Debug)]
enum DeliveryError {
    /// Connection, timeout or body transfer failed
    Transport(reqwest::Error),

    /// Server answered with a 5xx status
    Server(StatusCode),

    /// Server refused the batch itself (4xx); resending cannot help
    Rejected(StatusCode),
}

impl DeliveryError {
    fn is_retryable(&self) -> bool {
        !matches!(self, DeliveryError::Rejected(_))
    }
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Transport(e) => write!(f, "failed to send HTTP request: {e}"),
            DeliveryError::Server(status) => write!(f, "HTTP error: {status}"),
            DeliveryError::Rejected(status) => write!(f, "batch rejected: {status}"),
        }
    }
}

impl std::error::Error for DeliveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeliveryError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

/// Actor that periodically sends the collector's batch to the server
pub struct ReporterActor {
    collector: CollectorHandle,

    /// HTTP client (reused across requests)
    client: reqwest::Client,

    endpoint: String,
    config: ReporterConfig,
    command_rx: mpsc::Receiver<ReporterCommand>,
}

impl ReporterActor {
    pub fn new(
        collector: CollectorHandle,
        config: ReporterConfig,
        command_rx: mpsc::Receiver<ReporterCommand>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            collector,
            client,
            endpoint: format!("http://{}/updates/", config.address),
            config,
            command_rx,
        })
    }

    /// Run the actor's main loop
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn run(mut self) {
        debug!("starting reporter actor");

        let period = self.config.report_interval.max(Duration::from_millis(1));
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.report().await {
                        error!("failed to report metrics: {:#}", e);
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        ReporterCommand::ReportNow { respond_to } => {
                            debug!("received ReportNow command");
                            let _ = respond_to.send(self.report().await);
                        }

                        ReporterCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("reporter actor stopped");
    }

    /// Take a batch and deliver it
    ///
    /// Returns the number of metrics delivered. On failure the batch's polls
    /// go back to the collector.
    async fn report(&self) -> Result<usize> {
        let batch = self.collector.take_batch().await?;
        if batch.is_empty() {
            trace!("nothing to report");
            return Ok(0);
        }

        let polls = batch
            .iter()
            .find_map(|metric| match metric.value {
                MetricValue::Counter(polls) if metric.id == POLL_COUNT => Some(polls),
                _ => None,
            })
            .unwrap_or_default();

        let result = match self.encode(&batch) {
            Ok((body, signature)) => self.deliver(body, signature).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                debug!("reported {} metrics", batch.len());
                Ok(batch.len())
            }
            Err(e) => {
                if polls != 0
                    && let Err(return_err) = self.collector.return_polls(polls).await
                {
                    warn!("failed to return {polls} polls to collector: {return_err:#}");
                }
                Err(e)
            }
        }
    }

    /// Serialize, sign and compress a batch
    fn encode(&self, batch: &[Metric]) -> Result<(Vec<u8>, Option<String>)> {
        let json = serde_json::to_vec(batch).context("failed to serialize batch")?;
        let signature = self.config.key.as_ref().map(|key| key.sign(&json));

        let mut encoder = GzEncoder::new(Vec::with_capacity(json.len() / 2), Compression::default());
        encoder
            .write_all(&json)
            .context("failed to compress batch")?;
        let body = encoder.finish().context("failed to compress batch")?;

        trace!("compressed batch from {} to {} bytes", json.len(), body.len());
        Ok((body, signature))
    }

    /// Send one encoded batch, retrying transient failures
    async fn deliver(&self, body: Vec<u8>, signature: Option<String>) -> Result<()> {
        let backoff = self.config.backoff;
        let mut retry = 0;

        loop {
            match self.send(&body, signature.as_deref()).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && retry < backoff.retries => {
                    let delay = backoff.delay(retry);
                    warn!("{e}, retrying in {delay:?}");
                    time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn send(&self, body: &[u8], signature: Option<&str>) -> Result<(), DeliveryError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_ENCODING, "gzip");

        if let Some(signature) = signature {
            request = request.header(SIGNATURE_HEADER, signature);
        }

        let response = request
            .body(body.to_vec())
            .send()
            .await
            .map_err(DeliveryError::Transport)?;

        let status = response.status();
        if status.is_client_error() {
            return Err(DeliveryError::Rejected(status));
        }
        if !status.is_success() {
            return Err(DeliveryError::Server(status));
        }

        Ok(())
    }
}

/// Handle for controlling the ReporterActor
#[derive(Clone)]
pub struct ReporterHandle {
    sender: mpsc::Sender<ReporterCommand>,
}

impl ReporterHandle {
    /// Spawn a new reporter actor draining `collector`
    pub fn spawn(collector: CollectorHandle, config: ReporterConfig) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        let actor = ReporterActor::new(collector, config, cmd_rx)?;
        tokio::spawn(actor.run());

        Ok(Self { sender: cmd_tx })
    }

    /// Report immediately; returns the number of metrics delivered
    pub async fn report_now(&self) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ReporterCommand::ReportNow { respond_to: tx })
            .await
            .context("failed to send ReportNow command")?;

        rx.await.context("failed to receive response")?
    }

    /// Gracefully shut down the reporter
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(ReporterCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
