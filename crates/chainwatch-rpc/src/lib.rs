//! chainwatch-rpc — JSON-RPC 2.0 wire types and the HTTP Ethereum client.
//!
//! The watcher pipeline consumes exactly two chain-node operations, both
//! behind the [`EthereumRpc`] trait:
//!
//! - `eth_blockNumber` → current head height
//! - `eth_getBlockByNumber(h, true)` → full block with transactions

pub mod client;
pub mod error;
pub mod request;
pub mod types;

pub use client::{EthereumRpc, HttpRpcClient};
pub use error::TransportError;
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use types::{parse_hex_u64, Block, ParseHexError, Transaction};
