use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tally::{
    Repository,
    actors::SnapshotHandle,
    api::{ApiState, spawn_api_server},
    config::ServerArgs,
    signature::SignatureKey,
    storage::open_backend,
};
use tokio::sync::oneshot;
use tracing::{error, info, trace, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tally::init_logging("tally_server");

    let args = ServerArgs::parse();
    trace!("started with args: {args:?}");
    let config = args.resolve()?;

    let key = SignatureKey::from_config(config.key.as_deref()).context("invalid signature key")?;
    let backend = open_backend(&config.storage())
        .await
        .context("failed to open storage")?;
    info!("using {} storage", backend.kind());

    let snapshots = config
        .needs_snapshot_ticker()
        .then(|| SnapshotHandle::spawn(backend.clone(), config.store_interval));

    let repository = Arc::new(Repository::new(backend.clone()));
    let state = ApiState::new(repository, key);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let (addr, server) = spawn_api_server(config.api(), state, async move {
        stop_rx.await.ok();
    })
    .await
    .context("failed to start API server")?;
    info!("accepting metrics on {addr}");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");

    stop_tx.send(()).ok();
    if let Err(e) = server.await {
        error!("API server task failed: {e}");
    }

    if let Some(snapshots) = snapshots
        && let Err(e) = snapshots.shutdown().await
    {
        warn!("final snapshot failed: {e:#}");
    }

    if let Err(e) = backend.close().await {
        warn!("failed to close storage: {e}");
    }

    Ok(())
}
