//! Actor-based background tasks
//!
//! Each actor runs as an independent async task and is controlled through a
//! cloneable handle that sends commands over a Tokio channel.
//!
//! ## Architecture Overview
//!
//! ```text
//!  agent                                      server
//!  ┌───────────────┐  take_batch  ┌──────────────┐      ┌───────────────┐
//!  │ CollectorActor│ ◄─────────── │ ReporterActor│ ───► │ POST /updates/│
//!  │  (sampler)    │ ───────────► │  (reqwest)   │ HTTP └───────┬───────┘
//!  └───────────────┘  return_polls└──────────────┘              │
//!                                                          ┌────▼────┐
//!                                  ┌──────────────┐ write  │ Memory  │
//!                                  │ SnapshotActor│ ─────► │ Backend │
//!                                  └──────────────┘        └─────────┘
//! ```
//!
//! ## Actor Types
//!
//! - **CollectorActor**: Polls the runtime sampler at the poll interval
//! - **ReporterActor**: Sends the collected batch at the report interval,
//!   gzip-compressed, retrying with exponential backoff
//! - **SnapshotActor**: Checkpoints the in-memory store at the store interval
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: Each actor has an mpsc command channel for control messages
//! 2. **Request/Response**: oneshot channels for replies

pub mod collector;
pub mod messages;
pub mod reporter;
pub mod snapshot;

pub use collector::CollectorHandle;
pub use reporter::{Backoff, ReporterConfig, ReporterHandle};
pub use snapshot::SnapshotHandle;
