//! Block fetcher — a pool of workers that turn pending heights into full
//! blocks.
//!
//! Each worker pulls a height, fetches the block under a per-attempt
//! deadline, and forwards it downstream. A node that has not yet indexed
//! the height (stale or inconsistent response) is retried with capped
//! exponential backoff; a transport error abandons the height outright.

use std::sync::Arc;

use chainwatch_rpc::{parse_hex_u64, Block, EthereumRpc};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::BackoffConfig;
use crate::config::BlockFetcherConfig;

/// The block fetcher stage.
pub struct BlockFetcher<C> {
    config: BlockFetcherConfig,
    rpc: Arc<C>,
    heights_rx: Arc<Mutex<mpsc::Receiver<u64>>>,
    blocks_tx: mpsc::Sender<Block>,
    cancel: CancellationToken,
}

impl<C: EthereumRpc + 'static> BlockFetcher<C> {
    pub fn new(
        config: BlockFetcherConfig,
        rpc: Arc<C>,
        heights_rx: mpsc::Receiver<u64>,
        blocks_tx: mpsc::Sender<Block>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            rpc,
            heights_rx: Arc::new(Mutex::new(heights_rx)),
            blocks_tx,
            cancel,
        }
    }

    /// Spawn the worker pool and wait for every worker to finish.
    pub async fn run(self) {
        let workers = self.config.workers.max(1);
        info!(workers, "starting block fetcher");

        let mut pool = JoinSet::new();
        for _ in 0..workers {
            let config = self.config.clone();
            let rpc = Arc::clone(&self.rpc);
            let heights_rx = Arc::clone(&self.heights_rx);
            let blocks_tx = self.blocks_tx.clone();
            let cancel = self.cancel.clone();

            pool.spawn(async move {
                worker(config, rpc, heights_rx, blocks_tx, cancel).await;
            });
        }

        while pool.join_next().await.is_some() {}
    }
}

async fn worker<C: EthereumRpc>(
    config: BlockFetcherConfig,
    rpc: Arc<C>,
    heights_rx: Arc<Mutex<mpsc::Receiver<u64>>>,
    blocks_tx: mpsc::Sender<Block>,
    cancel: CancellationToken,
) {
    debug!("starting block fetcher worker");
    loop {
        // The receiver lock is held only across the dequeue.
        let height = {
            let mut rx = heights_rx.lock().await;
            tokio::select! {
                _ = cancel.cancelled() => return,
                received = rx.recv() => match received {
                    Some(h) => h,
                    None => return,
                },
            }
        };

        let Some(block) = fetch_with_retry(&config, rpc.as_ref(), height, &cancel).await else {
            continue;
        };

        tokio::select! {
            _ = cancel.cancelled() => return,
            sent = blocks_tx.send(block) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}

/// Fetch `height`, retrying while the node serves a block whose number
/// does not match the request. Returns `None` when the height is
/// abandoned (error, timeout, malformed number, or cancellation).
async fn fetch_with_retry<C: EthereumRpc>(
    config: &BlockFetcherConfig,
    rpc: &C,
    height: u64,
    cancel: &CancellationToken,
) -> Option<Block> {
    let backoff = BackoffConfig {
        base: config.retry_base_delay,
        max: config.retry_max_delay,
        jitter: config.jitter,
    };

    let mut attempt = 0u32;
    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => return None,
            result = tokio::time::timeout(config.req_timeout, rpc.get_block_by_number(height)) => result,
        };

        let block = match result {
            Err(_) => {
                warn!(height, "block request timed out, dropping height");
                return None;
            }
            Ok(Err(err)) => {
                warn!(height, error = %err, "block fetch failed, dropping height");
                return None;
            }
            Ok(Ok(block)) => block,
        };

        match parse_hex_u64(&block.number) {
            Ok(number) if number == height => return Some(block),
            Ok(number) => {
                debug!(
                    height,
                    got = number,
                    attempt,
                    "node returned a different block, backing off"
                );
            }
            Err(err) => {
                warn!(height, error = %err, "malformed block number, dropping height");
                return None;
            }
        }

        let delay = backoff.delay(attempt);
        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}
