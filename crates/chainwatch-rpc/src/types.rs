//! Ethereum block and transaction DTOs as returned by `eth_getBlockByNumber`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A full block with transaction objects (`eth_getBlockByNumber(h, true)`).
///
/// The pipeline only reads `number`, `hash`, and `transactions`; the
/// remaining fields are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub number: String,
    pub hash: String,
    #[serde(default)]
    pub parent_hash: String,
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub sha3_uncles: String,
    #[serde(default)]
    pub logs_bloom: String,
    #[serde(default)]
    pub transactions_root: String,
    #[serde(default)]
    pub state_root: String,
    #[serde(default)]
    pub receipts_root: String,
    #[serde(default)]
    pub miner: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub total_difficulty: String,
    #[serde(default)]
    pub extra_data: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub gas_limit: String,
    #[serde(default)]
    pub gas_used: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub uncles: Vec<String>,
}

/// A transaction object embedded in a block.
///
/// `to` is absent for contract-creation transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: String,
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub block_hash: String,
    #[serde(default)]
    pub block_number: String,
    #[serde(default)]
    pub transaction_index: String,
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    pub value: String,
    #[serde(default)]
    pub gas: String,
    #[serde(default)]
    pub gas_price: String,
    #[serde(default)]
    pub input: String,
}

/// Failure to decode a hex-encoded unsigned integer.
#[derive(Debug, Error)]
#[error("invalid hex integer {0:?}")]
pub struct ParseHexError(pub String);

/// Parse a hex-encoded string (with or without a `0x` prefix) to `u64`.
pub fn parse_hex_u64(s: &str) -> Result<u64, ParseHexError> {
    let lowered = s.to_lowercase();
    let digits = lowered.strip_prefix("0x").unwrap_or(&lowered);
    u64::from_str_radix(digits, 16).map_err(|_| ParseHexError(s.to_string()))
}
