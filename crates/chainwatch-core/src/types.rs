//! Shared types for the watcher pipeline.

use serde::{Deserialize, Serialize};

/// The pipeline's output record — one matched transaction side.
///
/// `from` keeps the original case reported by the node; `to` is the
/// canonical lowercase form (empty for contract-creation transactions).
/// `amount_wei` and `tx_hash` pass through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "amountWei")]
    pub amount_wei: String,
    #[serde(rename = "hash")]
    pub tx_hash: String,
    #[serde(rename = "blockNumber")]
    pub block_number: u64,
}
