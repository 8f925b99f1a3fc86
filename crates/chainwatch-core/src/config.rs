//! Per-stage configuration with environment-variable loading.
//!
//! All values are read once at startup (`WatcherConfig::from_env`) with
//! built-in fallbacks and treated as immutable once the pipeline is
//! constructed.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_RPC_URL: &str = "https://ethereum-rpc.publicnode.com";
pub const DEFAULT_CHECKPOINT_FILE: &str = "./data/checkpoint";
pub const DEFAULT_ADDRESS_FILE: &str = "./data/address.json";

pub const DEFAULT_HEADS_CHANNEL_SIZE: usize = 64;
pub const DEFAULT_BLOCKS_CHANNEL_SIZE: usize = 64;
pub const DEFAULT_EVENTS_CHANNEL_SIZE: usize = 1024;

pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_JITTER: f64 = 0.2;
pub const DEFAULT_MAX_ENQUEUE_PER_TICK: usize = 64;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(200);

/// Head monitor stage configuration.
#[derive(Debug, Clone)]
pub struct HeadMonitorConfig {
    /// How often to probe the chain head.
    pub poll_interval: Duration,
    /// First height to emit (the loaded checkpoint on a normal start).
    pub start_from: u64,
    /// Sleep jitter fraction in `[0, 1]`.
    pub jitter: f64,
    /// Cap on heights enqueued per tick; the rest wait for the next tick.
    pub max_enqueue_per_tick: usize,
}

impl Default for HeadMonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            start_from: 0,
            jitter: DEFAULT_JITTER,
            max_enqueue_per_tick: DEFAULT_MAX_ENQUEUE_PER_TICK,
        }
    }
}

/// Block fetcher stage configuration.
#[derive(Debug, Clone)]
pub struct BlockFetcherConfig {
    /// Number of concurrent fetch workers.
    pub workers: usize,
    /// Per-attempt deadline on the block request.
    pub req_timeout: Duration,
    /// Backoff base delay for stale-response retries.
    pub retry_base_delay: Duration,
    /// Backoff cap.
    pub retry_max_delay: Duration,
    /// Backoff jitter fraction.
    pub jitter: f64,
}

impl Default for BlockFetcherConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            req_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry_base_delay: DEFAULT_POLL_INTERVAL,
            retry_max_delay: DEFAULT_POLL_INTERVAL,
            jitter: DEFAULT_JITTER,
        }
    }
}

/// Filter matcher stage configuration.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Number of concurrent filter workers (`0` is coerced to 1).
    pub workers: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Sink stage configuration.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// How often the batch is flushed to the publisher.
    pub flush_interval: Duration,
    /// Batch size that triggers an immediate flush.
    pub batch_size: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Capacities of the three inter-stage queues.
#[derive(Debug, Clone)]
pub struct ChannelCapacities {
    pub heights: usize,
    pub blocks: usize,
    pub events: usize,
}

impl Default for ChannelCapacities {
    fn default() -> Self {
        Self {
            heights: DEFAULT_HEADS_CHANNEL_SIZE,
            blocks: DEFAULT_BLOCKS_CHANNEL_SIZE,
            events: DEFAULT_EVENTS_CHANNEL_SIZE,
        }
    }
}

/// Full watcher configuration.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub rpc_url: String,
    pub address_file: PathBuf,
    pub checkpoint_file: PathBuf,
    pub channels: ChannelCapacities,
    pub head: HeadMonitorConfig,
    pub fetcher: BlockFetcherConfig,
    pub filter: FilterConfig,
    pub sink: SinkConfig,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.into(),
            address_file: DEFAULT_ADDRESS_FILE.into(),
            checkpoint_file: DEFAULT_CHECKPOINT_FILE.into(),
            channels: ChannelCapacities::default(),
            head: HeadMonitorConfig::default(),
            fetcher: BlockFetcherConfig::default(),
            filter: FilterConfig::default(),
            sink: SinkConfig::default(),
        }
    }
}

impl WatcherConfig {
    /// Read the configuration from the environment, falling back to the
    /// built-in defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let poll_interval = env_duration_ms("POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL);
        let req_timeout = env_duration_ms("REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT);

        Self {
            rpc_url: env_string("RPC_URL", DEFAULT_RPC_URL),
            address_file: env_string("ADDRESS_FILE", DEFAULT_ADDRESS_FILE).into(),
            checkpoint_file: env_string("CHECKPOINT_FILE", DEFAULT_CHECKPOINT_FILE).into(),
            channels: ChannelCapacities::default(),
            head: HeadMonitorConfig {
                poll_interval,
                ..Default::default()
            },
            fetcher: BlockFetcherConfig {
                workers: env_usize("FETCH_WORKERS", DEFAULT_WORKERS),
                req_timeout,
                retry_base_delay: poll_interval,
                retry_max_delay: poll_interval,
                jitter: DEFAULT_JITTER,
            },
            filter: FilterConfig {
                workers: env_usize("FILTER_WORKERS", DEFAULT_WORKERS),
            },
            sink: SinkConfig {
                flush_interval: env_duration_ms("FLUSH_INTERVAL_MS", DEFAULT_FLUSH_INTERVAL),
                batch_size: env_usize("BATCH_SIZE", DEFAULT_BATCH_SIZE),
            },
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_duration_ms(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = WatcherConfig::default();
        assert_eq!(cfg.channels.heights, 64);
        assert_eq!(cfg.channels.blocks, 64);
        assert_eq!(cfg.channels.events, 1024);
        assert_eq!(cfg.head.max_enqueue_per_tick, 64);
        assert_eq!(cfg.fetcher.workers, 8);
        assert_eq!(cfg.sink.batch_size, 50);
    }

    #[test]
    fn env_helpers_fall_back() {
        assert_eq!(env_usize("CHAINWATCH_TEST_UNSET", 7), 7);
        assert_eq!(
            env_duration_ms("CHAINWATCH_TEST_UNSET", Duration::from_secs(3)),
            Duration::from_secs(3)
        );
        assert_eq!(env_string("CHAINWATCH_TEST_UNSET", "fallback"), "fallback");
    }

    #[test]
    fn env_overrides_are_read() {
        std::env::set_var("CHAINWATCH_TEST_USIZE", "12");
        assert_eq!(env_usize("CHAINWATCH_TEST_USIZE", 7), 12);
        std::env::remove_var("CHAINWATCH_TEST_USIZE");

        std::env::set_var("CHAINWATCH_TEST_BAD", "not-a-number");
        assert_eq!(env_usize("CHAINWATCH_TEST_BAD", 7), 7);
        std::env::remove_var("CHAINWATCH_TEST_BAD");
    }
}
