//! Metric collection agent and storage server
//!
//! The agent samples host and process readings and ships them to the server
//! in signed JSON batches. The server keeps gauges (last value wins) and
//! counters (deltas accumulate) in memory with an optional snapshot file, or
//! in a SQL database.

pub mod actors;
pub mod api;
pub mod config;
pub mod metric;
pub mod monitors;
pub mod repository;
pub mod signature;
pub mod storage;

pub use metric::{Metric, MetricCollection, MetricError, MetricKind, MetricValue};
pub use repository::{Repository, RetryPolicy};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr log subscriber used by both binaries
pub fn init_logging(binary: &'static str) {
    let filter = filter::Targets::new()
        .with_targets(vec![("tally", LevelFilter::DEBUG), (binary, LevelFilter::DEBUG)])
        .with_default(LevelFilter::INFO);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}
