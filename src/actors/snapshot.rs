//! SnapshotActor - Periodically checkpoints the in-memory store to disk
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick ──┐
//! Flush ───────┼──> backend.write_to_file()
//! Shutdown ────┘    (final write, then stop)
//! ```
//!
//! With a zero interval the backend writes through on every store and the
//! timer is disabled; `Flush` and `Shutdown` still write.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, trace, warn};

use super::messages::SnapshotCommand;
use crate::storage::{StorageBackend, StorageResult};

/// Actor that owns the snapshot schedule of one backend
pub struct SnapshotActor {
    backend: Arc<dyn StorageBackend>,
    interval: Duration,
    command_rx: mpsc::Receiver<SnapshotCommand>,
    writes: u64,
}

impl SnapshotActor {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        interval: Duration,
        command_rx: mpsc::Receiver<SnapshotCommand>,
    ) -> Self {
        Self {
            backend,
            interval,
            command_rx,
            writes: 0,
        }
    }

    /// Run the actor's main loop
    #[instrument(skip(self), fields(interval = ?self.interval))]
    pub async fn run(mut self) {
        let periodic = !self.interval.is_zero();
        debug!("starting snapshot actor (periodic: {periodic})");

        // `interval_at` panics on a zero period; the branch is disabled then.
        let period = self.interval.max(Duration::from_millis(1));
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick(), if periodic => {
                    trace!("periodic snapshot triggered");
                    if let Err(e) = self.write().await {
                        error!("failed to write snapshot: {e}");
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        SnapshotCommand::Flush { respond_to } => {
                            debug!("manual flush requested");
                            let _ = respond_to.send(self.write().await);
                        }

                        SnapshotCommand::Shutdown { respond_to } => {
                            debug!("received shutdown command, writing final snapshot");
                            let _ = respond_to.send(self.write().await);
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

        info!("snapshot actor stopped after {} writes", self.writes);
    }

    async fn write(&mut self) -> StorageResult<()> {
        self.backend.write_to_file().await?;
        self.writes += 1;
        Ok(())
    }
}

/// Handle for controlling the SnapshotActor
#[derive(Clone)]
pub struct SnapshotHandle {
    sender: mpsc::Sender<SnapshotCommand>,
}

impl SnapshotHandle {
    /// Spawn a new snapshot actor for `backend`
    pub fn spawn(backend: Arc<dyn StorageBackend>, interval: Duration) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        let actor = SnapshotActor::new(backend, interval, cmd_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Write the snapshot now
    pub async fn flush(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SnapshotCommand::Flush { respond_to: tx })
            .await
            .context("failed to send Flush command")?;

        rx.await.context("failed to receive response")??;
        Ok(())
    }

    /// Write the final snapshot and stop the actor
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SnapshotCommand::Shutdown { respond_to: tx })
            .await
            .context("failed to send Shutdown command")?;

        rx.await.context("failed to receive response")??;
        Ok(())
    }
}
