//! chainwatch daemon — wires the pipeline to the real collaborators and
//! handles process lifecycle.
//!
//! One SIGINT/SIGTERM triggers a graceful shutdown (stages drain, the
//! sink performs a final flush and checkpoint commit); a second signal
//! exits immediately with a non-zero status.

mod publisher;

use std::sync::Arc;

use anyhow::Context;
use chainwatch_core::{
    AddressIndex, CheckpointStore, FileCheckpointStore, Publisher, Watcher, WatcherConfig,
};
use chainwatch_rpc::HttpRpcClient;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::publisher::LogPublisher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = WatcherConfig::from_env();
    info!(
        rpc_url = %config.rpc_url,
        address_file = %config.address_file.display(),
        checkpoint_file = %config.checkpoint_file.display(),
        "starting chainwatch"
    );

    let rpc = Arc::new(HttpRpcClient::new(&config.rpc_url));

    let index = Arc::new(
        AddressIndex::from_json_file(&config.address_file)
            .with_context(|| format!("loading address file {}", config.address_file.display()))?,
    );
    if index.is_empty() {
        warn!("address index is empty, no transactions will match");
    }
    info!(addresses = index.len(), "address index loaded");

    if let Some(dir) = config.checkpoint_file.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating checkpoint directory {}", dir.display()))?;
    }
    let store: Arc<dyn CheckpointStore> = Arc::new(FileCheckpointStore::new(&config.checkpoint_file));
    let bus: Arc<dyn Publisher> = Arc::new(LogPublisher);

    let cancel = CancellationToken::new();
    let watcher = Watcher::new(config, rpc, index, store, bus);
    let mut pipeline = tokio::spawn(watcher.run(cancel.clone()));

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => info!("SIGINT received, shutting down"),
        _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
        result = &mut pipeline => {
            // The pipeline only returns on its own if a stage died.
            result.context("pipeline task failed")?;
            return Ok(());
        }
    }

    cancel.cancel();

    // Wait for the drain, but a second signal forces the exit.
    tokio::select! {
        _ = sigint.recv() => {
            error!("second signal during shutdown, exiting immediately");
            std::process::exit(1);
        }
        _ = sigterm.recv() => {
            error!("second signal during shutdown, exiting immediately");
            std::process::exit(1);
        }
        result = &mut pipeline => {
            result.context("pipeline task failed")?;
        }
    }

    info!("shutdown complete");
    Ok(())
}
