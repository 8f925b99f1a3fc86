//! Publisher binding for the daemon.
//!
//! The message bus proper is an external collaborator; the daemon ships
//! with a log-backed publisher that emits each payload as a structured
//! log line.

use async_trait::async_trait;
use chainwatch_core::{Publisher, WatcherError};
use tracing::info;

/// Publishes each payload as an info-level log record.
#[derive(Debug, Default)]
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, payload: &[u8]) -> Result<(), WatcherError> {
        info!(event = %String::from_utf8_lossy(payload), "publish");
        Ok(())
    }
}
