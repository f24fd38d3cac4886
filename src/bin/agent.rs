use anyhow::Context;
use clap::Parser;
use tally::{
    actors::{Backoff, CollectorHandle, ReporterConfig, ReporterHandle},
    config::AgentArgs,
    monitors::RuntimeSampler,
    signature::SignatureKey,
};
use tracing::{info, trace, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tally::init_logging("tally_agent");

    let args = AgentArgs::parse();
    trace!("started with args: {args:?}");
    let config = args.resolve()?;

    let key = SignatureKey::from_config(config.key.as_deref()).context("invalid signature key")?;

    let collector = CollectorHandle::spawn(RuntimeSampler::new(), config.poll_interval);
    let reporter = ReporterHandle::spawn(
        collector.clone(),
        ReporterConfig {
            address: config.address.clone(),
            report_interval: config.report_interval,
            key,
            backoff: Backoff::default(),
        },
    )?;
    info!(
        "reporting to {} every {:?} (polling every {:?})",
        config.address, config.report_interval, config.poll_interval
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");

    if let Err(e) = reporter.shutdown().await {
        warn!("failed to stop reporter: {e:#}");
    }
    if let Err(e) = collector.shutdown().await {
        warn!("failed to stop collector: {e:#}");
    }

    Ok(())
}
