//! chainwatch-core — the staged processing pipeline of the on-chain
//! activity watcher.
//!
//! # Architecture
//!
//! ```text
//! HeadMonitor ─heights─▶ BlockFetcher ─blocks─▶ FilterMatcher ─events─▶ Sink ─▶ Publisher
//!                                                      │
//!                                               AddressIndex (read-only)
//!                                                      │
//!                                               CheckpointStore (read at start, write from Sink)
//! ```
//!
//! Stages communicate only through bounded queues; the only right-to-left
//! signals are backpressure and a shared cancellation token. Delivery to
//! the publisher is at-least-once and the durable checkpoint only ever
//! advances.

pub mod address;
pub mod backoff;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod head;
pub mod pipeline;
pub mod sink;
pub mod types;

pub use address::AddressIndex;
pub use backoff::{with_jitter, BackoffConfig};
pub use checkpoint::{Checkpoint, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use config::WatcherConfig;
pub use error::WatcherError;
pub use pipeline::Watcher;
pub use sink::Publisher;
pub use types::Event;
