//! Pipeline wiring — builds the bounded queues, spawns the four stages,
//! and waits for them to drain on shutdown.

use std::sync::Arc;

use chainwatch_rpc::EthereumRpc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::address::AddressIndex;
use crate::checkpoint::CheckpointStore;
use crate::config::WatcherConfig;
use crate::fetcher::BlockFetcher;
use crate::filter::FilterMatcher;
use crate::head::HeadMonitor;
use crate::sink::{Publisher, Sink};

/// The assembled watcher: four stages connected by three bounded queues.
///
/// ```text
/// HeadMonitor ─heights─▶ BlockFetcher ─blocks─▶ FilterMatcher ─events─▶ Sink
///                                                     │                  │
///                                                AddressIndex      CheckpointStore
/// ```
pub struct Watcher<C> {
    config: WatcherConfig,
    rpc: Arc<C>,
    index: Arc<AddressIndex>,
    store: Arc<dyn CheckpointStore>,
    publisher: Arc<dyn Publisher>,
}

impl<C: EthereumRpc + 'static> Watcher<C> {
    pub fn new(
        config: WatcherConfig,
        rpc: Arc<C>,
        index: Arc<AddressIndex>,
        store: Arc<dyn CheckpointStore>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            config,
            rpc,
            index,
            store,
            publisher,
        }
    }

    /// Run the pipeline until `cancel` fires, then wait for every stage to
    /// return. The sink performs its final flush and checkpoint commit as
    /// part of this drain.
    pub async fn run(self, cancel: CancellationToken) {
        let start_from = match self.store.load().await {
            Ok(confirmed) => confirmed,
            Err(err) => {
                warn!(error = %err, "checkpoint load failed, starting from 0");
                0
            }
        };
        info!(start_from, "starting watcher pipeline");

        let (heights_tx, heights_rx) = mpsc::channel(self.config.channels.heights);
        let (blocks_tx, blocks_rx) = mpsc::channel(self.config.channels.blocks);
        let (events_tx, events_rx) = mpsc::channel(self.config.channels.events);

        let head = HeadMonitor::new(
            crate::config::HeadMonitorConfig {
                start_from,
                ..self.config.head
            },
            Arc::clone(&self.rpc),
            heights_tx,
            cancel.clone(),
        );

        let fetcher = BlockFetcher::new(
            self.config.fetcher.clone(),
            Arc::clone(&self.rpc),
            heights_rx,
            blocks_tx,
            cancel.clone(),
        );

        let filter = FilterMatcher::new(
            self.config.filter.clone(),
            Arc::clone(&self.index),
            blocks_rx,
            events_tx,
            cancel.clone(),
        );

        let sink = Sink::new(
            self.config.sink.clone(),
            events_rx,
            Arc::clone(&self.publisher),
            Arc::clone(&self.store),
            cancel.clone(),
        );

        let mut stages = JoinSet::new();
        stages.spawn(head.run());
        stages.spawn(fetcher.run());
        stages.spawn(filter.run());
        stages.spawn(sink.run());

        while stages.join_next().await.is_some() {}
        info!("watcher pipeline stopped");
    }
}
