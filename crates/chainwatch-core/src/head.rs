//! Head monitor — polls the chain for the current head and feeds pending
//! heights to the fetch stage.
//!
//! Heights are emitted in strictly increasing order with no gaps. Enqueues
//! are non-blocking with a per-tick cap: when the downstream queue fills
//! up, the rest of the tick is abandoned and the monitor catches up on a
//! later tick.

use std::sync::Arc;
use std::time::Duration;

use chainwatch_rpc::EthereumRpc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::with_jitter;
use crate::config::HeadMonitorConfig;

/// The head monitor stage.
pub struct HeadMonitor<C> {
    config: HeadMonitorConfig,
    rpc: Arc<C>,
    heights_tx: mpsc::Sender<u64>,
    cancel: CancellationToken,
}

impl<C: EthereumRpc> HeadMonitor<C> {
    pub fn new(
        config: HeadMonitorConfig,
        rpc: Arc<C>,
        heights_tx: mpsc::Sender<u64>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            rpc,
            heights_tx,
            cancel,
        }
    }

    /// Run until cancelled or the heights queue is closed.
    pub async fn run(self) {
        info!(start_from = self.config.start_from, "starting head monitor");

        let mut next_height = self.config.start_from;
        // First probe fires immediately; subsequent ticks are jittered.
        let mut delay = Duration::ZERO;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            let head = tokio::select! {
                _ = self.cancel.cancelled() => return,
                result = self.rpc.get_current_block_number() => result,
            };

            match head {
                Ok(head) => {
                    let mut sent = 0;
                    while next_height <= head && sent < self.config.max_enqueue_per_tick {
                        match self.heights_tx.try_send(next_height) {
                            Ok(()) => {
                                next_height += 1;
                                sent += 1;
                            }
                            // Downstream is saturated; pick up where we
                            // left off on the next tick.
                            Err(TrySendError::Full(_)) => break,
                            Err(TrySendError::Closed(_)) => return,
                        }
                    }
                    debug!(head, next_height, sent, "head tick");
                }
                Err(err) => {
                    warn!(error = %err, "head probe failed, skipping tick");
                }
            }

            delay = with_jitter(self.config.poll_interval, self.config.jitter);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    use async_trait::async_trait;
    use chainwatch_rpc::{Block, TransportError};

    /// Fake RPC returning a fixed head, or an error when `head` is `None`.
    struct FixedHeadRpc {
        head: Option<u64>,
        probes: AtomicU64,
    }

    impl FixedHeadRpc {
        fn new(head: Option<u64>) -> Self {
            Self {
                head,
                probes: AtomicU64::new(0),
            }
        }
    }

    #[async_trait]
    impl EthereumRpc for FixedHeadRpc {
        async fn get_current_block_number(&self) -> Result<u64, TransportError> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.head
                .ok_or_else(|| TransportError::Http("probe failed".into()))
        }

        async fn get_block_by_number(&self, _number: u64) -> Result<Block, TransportError> {
            unimplemented!("head monitor never fetches blocks")
        }
    }

    fn config(start_from: u64, max_per_tick: usize) -> HeadMonitorConfig {
        HeadMonitorConfig {
            poll_interval: Duration::from_millis(10),
            start_from,
            jitter: 0.0,
            max_enqueue_per_tick: max_per_tick,
        }
    }

    #[tokio::test]
    async fn emits_contiguous_heights_from_start() {
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let monitor = HeadMonitor::new(
            config(10, 64),
            Arc::new(FixedHeadRpc::new(Some(14))),
            tx,
            cancel.clone(),
        );
        let handle = tokio::spawn(monitor.run());

        let mut got = Vec::new();
        for _ in 0..5 {
            got.push(rx.recv().await.unwrap());
        }
        assert_eq!(got, vec![10, 11, 12, 13, 14]);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn never_repeats_or_skips_across_ticks() {
        let (tx, mut rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let monitor = HeadMonitor::new(
            config(0, 2), // two per tick, several ticks needed
            Arc::new(FixedHeadRpc::new(Some(9))),
            tx,
            cancel.clone(),
        );
        let handle = tokio::spawn(monitor.run());

        let mut got = Vec::new();
        for _ in 0..10 {
            got.push(rx.recv().await.unwrap());
        }
        assert_eq!(got, (0..10).collect::<Vec<u64>>());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn full_queue_abandons_tick_without_losing_heights() {
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let monitor = HeadMonitor::new(
            config(0, 64),
            Arc::new(FixedHeadRpc::new(Some(100))),
            tx,
            cancel.clone(),
        );
        let handle = tokio::spawn(monitor.run());

        // Drain slowly; despite the size-1 queue every height arrives in
        // order, one tick at a time.
        for expected in 0..5 {
            assert_eq!(rx.recv().await.unwrap(), expected);
        }

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn rpc_error_skips_tick_and_retries() {
        let rpc = Arc::new(FixedHeadRpc::new(None));
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let monitor = HeadMonitor::new(config(0, 64), rpc.clone(), tx, cancel.clone());
        let handle = tokio::spawn(monitor.run());

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        handle.await.unwrap();

        // Probed repeatedly, emitted nothing.
        assert!(rpc.probes.load(Ordering::SeqCst) >= 2);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn cancellation_returns_promptly() {
        let (tx, _rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let monitor = HeadMonitor::new(
            HeadMonitorConfig {
                poll_interval: Duration::from_secs(3600),
                ..config(0, 64)
            },
            Arc::new(FixedHeadRpc::new(Some(0))),
            tx,
            cancel.clone(),
        );
        let handle = tokio::spawn(monitor.run());

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor did not stop on cancellation")
            .unwrap();
    }
}
