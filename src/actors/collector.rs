//! CollectorActor - Polls the local sampler for metrics
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → Sampler::sample() → keep latest gauges, count poll
//!     ↑
//!     └─── Commands (PollNow, TakeBatch, ReturnPolls, Shutdown)
//! ```
//!
//! The collector never sends anything itself. The reporter asks for a batch,
//! which contains the latest reading of every gauge plus a `PollCount`
//! counter holding the polls since the previous batch.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, instrument, trace, warn};

use super::messages::CollectorCommand;
use crate::metric::Metric;
use crate::monitors::Sampler;

/// Id of the counter that tracks polls
pub const POLL_COUNT: &str = "PollCount";

/// Actor that polls a sampler at a fixed interval
pub struct CollectorActor<S: Sampler> {
    sampler: S,

    /// Latest reading per gauge id
    gauges: BTreeMap<String, Metric>,

    /// Polls since the last batch was taken
    polls: i64,

    poll_interval: Duration,
    command_rx: mpsc::Receiver<CollectorCommand>,
}

impl<S: Sampler> CollectorActor<S> {
    pub fn new(sampler: S, poll_interval: Duration, command_rx: mpsc::Receiver<CollectorCommand>) -> Self {
        Self {
            sampler,
            gauges: BTreeMap::new(),
            polls: 0,
            poll_interval,
            command_rx,
        }
    }

    /// Run the actor's main loop
    ///
    /// This runs until a Shutdown command is received or the command
    /// channel is closed.
    #[instrument(skip(self), fields(interval = ?self.poll_interval))]
    pub async fn run(mut self) {
        debug!("starting collector actor");

        let period = self.poll_interval.max(Duration::from_millis(1));
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.poll(),

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        CollectorCommand::PollNow { respond_to } => {
                            debug!("received PollNow command");
                            self.poll();
                            let _ = respond_to.send(());
                        }

                        CollectorCommand::TakeBatch { respond_to } => {
                            let _ = respond_to.send(self.take_batch());
                        }

                        CollectorCommand::ReturnPolls { polls } => {
                            debug!("{polls} unreported polls returned");
                            self.polls = self.polls.wrapping_add(polls);
                        }

                        CollectorCommand::Shutdown => {
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

        debug!("collector actor stopped");
    }

    fn poll(&mut self) {
        for metric in self.sampler.sample() {
            self.gauges.insert(metric.id.clone(), metric);
        }
        self.polls = self.polls.wrapping_add(1);
        trace!("poll #{} complete", self.polls);
    }

    fn take_batch(&mut self) -> Vec<Metric> {
        let mut batch: Vec<Metric> = self.gauges.values().cloned().collect();

        if self.polls != 0 {
            batch.push(Metric::counter(POLL_COUNT, self.polls));
            self.polls = 0;
        }

        batch
    }
}

/// Handle for controlling a CollectorActor
///
/// This handle can be cloned and shared across tasks.
#[derive(Clone)]
pub struct CollectorHandle {
    sender: mpsc::Sender<CollectorCommand>,
}

impl CollectorHandle {
    /// Spawn a new collector actor
    pub fn spawn<S: Sampler>(sampler: S, poll_interval: Duration) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = CollectorActor::new(sampler, poll_interval, cmd_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Trigger an immediate poll
    pub async fn poll_now(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CollectorCommand::PollNow { respond_to: tx })
            .await
            .context("failed to send PollNow command")?;

        rx.await.context("failed to receive response")?;
        Ok(())
    }

    /// Take the metrics to report
    pub async fn take_batch(&self) -> Result<Vec<Metric>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CollectorCommand::TakeBatch { respond_to: tx })
            .await
            .context("failed to send TakeBatch command")?;

        rx.await.context("failed to receive response")
    }

    /// Hand back polls of an undelivered batch
    pub async fn return_polls(&self, polls: i64) -> Result<()> {
        self.sender
            .send(CollectorCommand::ReturnPolls { polls })
            .await
            .context("failed to send ReturnPolls command")?;
        Ok(())
    }

    /// Gracefully shut down the collector
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(CollectorCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
