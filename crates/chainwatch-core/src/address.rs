//! Address index — immutable lookup from canonical-lowercase address to
//! user identifier.
//!
//! Built once at startup from a JSON file of `{userId, address}` records
//! and shared read-only across all filter workers.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::WatcherError;

#[derive(Debug, Deserialize)]
struct AddrRecord {
    #[serde(rename = "userId")]
    user_id: String,
    address: String,
}

/// In-memory address → user-id index.
///
/// Keys are stored lowercased; [`AddressIndex::lookup`] is
/// case-insensitive.
#[derive(Debug, Default)]
pub struct AddressIndex {
    data: HashMap<String, String>,
}

impl AddressIndex {
    /// Load the index from a JSON file of `[{"userId": ..., "address": ...}]`
    /// records.
    ///
    /// Each address is trimmed and lowercased, and must be a 42-character
    /// `0x`-prefixed string. The whole load fails on the first invalid
    /// entry.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, WatcherError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading address index");

        let raw = std::fs::read(path)?;
        let records: Vec<AddrRecord> = serde_json::from_slice(&raw)?;

        Self::from_records(records.into_iter().map(|r| (r.user_id, r.address)))
    }

    /// Build the index from `(user_id, address)` pairs, validating each
    /// address.
    pub fn from_records(
        records: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, WatcherError> {
        let mut data = HashMap::new();
        for (index, (user_id, address)) in records.into_iter().enumerate() {
            let canonical = address.trim().to_lowercase();
            if canonical.is_empty() {
                return Err(WatcherError::EmptyAddress { index });
            }
            if canonical.len() != 42 || !canonical.starts_with("0x") {
                return Err(WatcherError::InvalidAddress {
                    index,
                    value: address,
                });
            }
            data.insert(canonical, user_id);
        }
        Ok(Self { data })
    }

    /// Case-insensitive lookup; returns the user id for a known address.
    pub fn lookup(&self, address: &str) -> Option<&str> {
        self.data.get(&address.to_lowercase()).map(String::as_str)
    }

    /// Number of entries in the index.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
