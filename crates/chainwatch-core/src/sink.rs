//! Sink — batches events, hands them to the publisher, and advances the
//! durable checkpoint.
//!
//! Two tickers drive the sink: the configurable flush ticker and a fixed
//! checkpoint ticker. The checkpoint tracks the maximum block height
//! observed among arriving events and never regresses; a publish failure
//! drops only the failing payload.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::checkpoint::CheckpointStore;
use crate::config::SinkConfig;
use crate::error::WatcherError;
use crate::types::Event;

/// Fallbacks applied when the configured values are unusable.
const FALLBACK_FLUSH_INTERVAL: Duration = Duration::from_millis(250);
const FALLBACK_BATCH_SIZE: usize = 256;

/// Interval between checkpoint commit attempts.
const CHECKPOINT_INTERVAL: Duration = Duration::from_millis(500);

/// The outbound message-bus contract consumed by the sink: publish one
/// payload, observe success or error.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, payload: &[u8]) -> Result<(), WatcherError>;
}

/// The sink stage.
pub struct Sink {
    config: SinkConfig,
    events_rx: mpsc::Receiver<Event>,
    publisher: Arc<dyn Publisher>,
    store: Arc<dyn CheckpointStore>,
    cancel: CancellationToken,
}

impl Sink {
    pub fn new(
        config: SinkConfig,
        events_rx: mpsc::Receiver<Event>,
        publisher: Arc<dyn Publisher>,
        store: Arc<dyn CheckpointStore>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            events_rx,
            publisher,
            store,
            cancel,
        }
    }

    /// Run until cancelled or the events queue closes, then flush and
    /// attempt one final checkpoint commit.
    pub async fn run(self) {
        info!("starting sink");

        let Sink {
            config,
            mut events_rx,
            publisher,
            store,
            cancel,
        } = self;

        let flush_interval = if config.flush_interval.is_zero() {
            FALLBACK_FLUSH_INTERVAL
        } else {
            config.flush_interval
        };
        let batch_size = if config.batch_size == 0 {
            FALLBACK_BATCH_SIZE
        } else {
            config.batch_size
        };

        let mut state = match store.load().await {
            Ok(confirmed) => SinkState::starting_at(confirmed, batch_size),
            Err(err) => {
                warn!(error = %err, "checkpoint load failed, starting from 0");
                SinkState::starting_at(0, batch_size)
            }
        };

        let start = tokio::time::Instant::now();
        let mut flush_ticker = tokio::time::interval_at(start + flush_interval, flush_interval);
        let mut checkpoint_ticker =
            tokio::time::interval_at(start + CHECKPOINT_INTERVAL, CHECKPOINT_INTERVAL);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = events_rx.recv() => match received {
                    Some(event) => {
                        state.write_event(event);
                        if state.batch.len() >= batch_size {
                            state.flush(publisher.as_ref()).await;
                        }
                    }
                    None => break,
                },
                _ = flush_ticker.tick() => state.flush(publisher.as_ref()).await,
                _ = checkpoint_ticker.tick() => state.commit_checkpoint(store.as_ref()).await,
            }
        }

        state.flush(publisher.as_ref()).await;
        state.commit_checkpoint(store.as_ref()).await;
    }
}

/// Mutable sink bookkeeping shared by the event and tick handlers.
struct SinkState {
    batch: Vec<Vec<u8>>,
    max_seen: u64,
    last_saved: u64,
    pending_checkpoint: Option<u64>,
}

impl SinkState {
    fn starting_at(confirmed: u64, batch_capacity: usize) -> Self {
        Self {
            batch: Vec::with_capacity(batch_capacity),
            max_seen: confirmed,
            last_saved: confirmed,
            pending_checkpoint: None,
        }
    }

    /// Serialize and enqueue one event, tracking the highest block height
    /// observed so far.
    fn write_event(&mut self, event: Event) {
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "event serialization failed, dropping event");
                return;
            }
        };
        self.batch.push(payload);

        if event.block_number > self.max_seen {
            self.max_seen = event.block_number;
            if self.max_seen > self.last_saved {
                self.pending_checkpoint = Some(self.max_seen);
            }
        }
    }

    /// Publish every payload in the batch, in order. A failing payload is
    /// logged and discarded; the rest of the batch is still attempted.
    async fn flush(&mut self, publisher: &dyn Publisher) {
        if self.batch.is_empty() {
            return;
        }
        for payload in self.batch.drain(..) {
            if let Err(err) = publisher.publish(&payload).await {
                warn!(error = %err, "publish failed, dropping payload");
            }
        }
    }

    /// Commit the pending checkpoint if it advances the saved height.
    /// The pending value is consumed whether or not the save succeeds.
    async fn commit_checkpoint(&mut self, store: &dyn CheckpointStore) {
        let Some(confirmed) = self.pending_checkpoint.take() else {
            return;
        };
        if confirmed <= self.last_saved {
            return;
        }
        match store.save(confirmed).await {
            Ok(()) => {
                self.last_saved = confirmed;
                debug!(confirmed, "checkpoint saved");
            }
            Err(err) => warn!(error = %err, confirmed, "checkpoint save failed"),
        }
    }
}
