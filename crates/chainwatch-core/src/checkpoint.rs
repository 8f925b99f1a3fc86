//! Checkpoint store — persists the last fully processed block height so a
//! restart resumes without gaps and without re-publishing confirmed blocks.
//!
//! The file backend writes to a `.tmp` sibling and renames over the
//! primary path, so readers observe either the old or the new committed
//! value, never a torn write.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::WatcherError;

/// The persisted payload: `{"confirmed": <height>}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Checkpoint {
    pub confirmed: u64,
}

/// Trait for loading and saving the confirmed height.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the confirmed height; absence of any saved state is 0.
    async fn load(&self) -> Result<u64, WatcherError>;

    /// Durably save the confirmed height.
    async fn save(&self, confirmed: u64) -> Result<(), WatcherError>;
}

/// File-backed checkpoint store with atomic writes.
pub struct FileCheckpointStore {
    path: PathBuf,
    /// Serialises writers so concurrent saves cannot race on the temp file.
    write_lock: Mutex<()>,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut os = self.path.clone().into_os_string();
        os.push(".tmp");
        PathBuf::from(os)
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self) -> Result<u64, WatcherError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            // Primary unreadable: a crash between write and rename may have
            // left the committed value in the temp sibling.
            Err(_) => tokio::fs::read(self.tmp_path()).await?,
        };

        let cp: Checkpoint = serde_json::from_slice(&data)?;
        Ok(cp.confirmed)
    }

    async fn save(&self, confirmed: u64) -> Result<(), WatcherError> {
        let _guard = self.write_lock.lock().await;

        let tmp = self.tmp_path();
        let data = serde_json::to_vec(&Checkpoint { confirmed })?;

        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

// ─── In-memory store (for testing) ────────────────────────────────────────────

/// In-memory checkpoint store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    value: std::sync::Mutex<u64>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self) -> Result<u64, WatcherError> {
        Ok(*self.value.lock().unwrap())
    }

    async fn save(&self, confirmed: u64) -> Result<(), WatcherError> {
        *self.value.lock().unwrap() = confirmed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_at(dir: &tempfile::TempDir) -> FileCheckpointStore {
        FileCheckpointStore::new(dir.path().join("checkpoint"))
    }

    #[tokio::test]
    async fn missing_file_loads_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(&dir);
        assert_eq!(store.load().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(&dir);

        store.save(12345).await.unwrap();
        assert_eq!(store.load().await.unwrap(), 12345);

        // Save is idempotent.
        store.save(12345).await.unwrap();
        assert_eq!(store.load().await.unwrap(), 12345);
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint");

        FileCheckpointStore::new(&path).save(42).await.unwrap();

        let reopened = FileCheckpointStore::new(&path);
        assert_eq!(reopened.load().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn committed_file_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint");

        FileCheckpointStore::new(&path).save(7).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, r#"{"confirmed":7}"#);
        // The temp sibling is consumed by the rename.
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn decode_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint");
        std::fs::write(&path, "not json").unwrap();

        let store = FileCheckpointStore::new(&path);
        assert!(store.load().await.is_err());
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryCheckpointStore::new();
        assert_eq!(store.load().await.unwrap(), 0);
        store.save(1000).await.unwrap();
        assert_eq!(store.load().await.unwrap(), 1000);
    }
}
