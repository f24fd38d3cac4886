//! Message types for actor communication
//!
//! Every actor owns an mpsc command channel. Commands that need an answer
//! carry a oneshot sender for the reply.

use tokio::sync::oneshot;

use crate::metric::Metric;
use crate::storage::StorageResult;

/// Commands that can be sent to the SnapshotActor
#[derive(Debug)]
pub enum SnapshotCommand {
    /// Write the snapshot now, independent of the timer
    Flush {
        respond_to: oneshot::Sender<StorageResult<()>>,
    },

    /// Write a final snapshot and stop
    ///
    /// The reply is sent after the write, so the caller can close the
    /// backend right after.
    Shutdown {
        respond_to: oneshot::Sender<StorageResult<()>>,
    },
}

/// Commands that can be sent to the CollectorActor
#[derive(Debug)]
pub enum CollectorCommand {
    /// Trigger an immediate poll (bypassing the interval timer)
    PollNow { respond_to: oneshot::Sender<()> },

    /// Hand out the metrics to report and reset the poll counter
    TakeBatch {
        respond_to: oneshot::Sender<Vec<Metric>>,
    },

    /// Give back polls from a batch that could not be delivered
    ReturnPolls { polls: i64 },

    /// Stop polling
    Shutdown,
}

/// Commands that can be sent to the ReporterActor
#[derive(Debug)]
pub enum ReporterCommand {
    /// Send a report now; answers with the number of metrics delivered
    ReportNow {
        respond_to: oneshot::Sender<anyhow::Result<usize>>,
    },

    /// Stop reporting
    Shutdown,
}
