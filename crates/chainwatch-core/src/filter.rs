//! Filter matcher — scans block transactions against the address index
//! and emits one event per matching side.
//!
//! Transactions are scanned in block order and the `from` side is checked
//! before the `to` side, so a transaction between two known addresses
//! yields two events in that order.

use std::sync::Arc;

use chainwatch_rpc::{parse_hex_u64, Block};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::address::AddressIndex;
use crate::config::FilterConfig;
use crate::types::Event;

/// The filter matcher stage.
pub struct FilterMatcher {
    config: FilterConfig,
    index: Arc<AddressIndex>,
    blocks_rx: Arc<Mutex<mpsc::Receiver<Block>>>,
    events_tx: mpsc::Sender<Event>,
    cancel: CancellationToken,
}

impl FilterMatcher {
    pub fn new(
        config: FilterConfig,
        index: Arc<AddressIndex>,
        blocks_rx: mpsc::Receiver<Block>,
        events_tx: mpsc::Sender<Event>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            index,
            blocks_rx: Arc::new(Mutex::new(blocks_rx)),
            events_tx,
            cancel,
        }
    }

    /// Spawn the worker pool and wait for every worker to finish.
    pub async fn run(self) {
        let workers = self.config.workers.max(1);
        info!(workers, "starting filter matcher");

        let mut pool = JoinSet::new();
        for _ in 0..workers {
            let index = Arc::clone(&self.index);
            let blocks_rx = Arc::clone(&self.blocks_rx);
            let events_tx = self.events_tx.clone();
            let cancel = self.cancel.clone();

            pool.spawn(async move {
                worker(index, blocks_rx, events_tx, cancel).await;
            });
        }

        while pool.join_next().await.is_some() {}
    }
}

async fn worker(
    index: Arc<AddressIndex>,
    blocks_rx: Arc<Mutex<mpsc::Receiver<Block>>>,
    events_tx: mpsc::Sender<Event>,
    cancel: CancellationToken,
) {
    loop {
        let block = {
            let mut rx = blocks_rx.lock().await;
            tokio::select! {
                _ = cancel.cancelled() => return,
                received = rx.recv() => match received {
                    Some(b) => b,
                    None => return,
                },
            }
        };

        if !process_block(&block, &index, &events_tx, &cancel).await {
            return;
        }
    }
}

/// Scan one block. Returns `false` when the worker should stop
/// (cancellation or a closed events queue).
async fn process_block(
    block: &Block,
    index: &AddressIndex,
    events_tx: &mpsc::Sender<Event>,
    cancel: &CancellationToken,
) -> bool {
    let block_number = match parse_hex_u64(&block.number) {
        Ok(n) => n,
        Err(err) => {
            warn!(number = %block.number, error = %err, "malformed block number, skipping block");
            return true;
        }
    };

    for tx in &block.transactions {
        let from = tx.from.to_lowercase();
        let to = tx.to.as_deref().map(str::to_lowercase).unwrap_or_default();

        if let Some(user_id) = index.lookup(&from) {
            let event = Event {
                user_id: user_id.to_string(),
                from: tx.from.clone(),
                to: to.clone(),
                amount_wei: tx.value.clone(),
                tx_hash: tx.hash.clone(),
                block_number,
            };
            if !emit(events_tx, cancel, event).await {
                return false;
            }
        }

        if let Some(user_id) = index.lookup(&to) {
            let event = Event {
                user_id: user_id.to_string(),
                from: tx.from.clone(),
                to: to.clone(),
                amount_wei: tx.value.clone(),
                tx_hash: tx.hash.clone(),
                block_number,
            };
            if !emit(events_tx, cancel, event).await {
                return false;
            }
        }
    }

    debug!(block_number, txs = block.transactions.len(), "block scanned");
    true
}

/// Blocking, cancellation-aware send onto the events queue.
async fn emit(events_tx: &mpsc::Sender<Event>, cancel: &CancellationToken, event: Event) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        sent = events_tx.send(event) => sent.is_ok(),
    }
}
