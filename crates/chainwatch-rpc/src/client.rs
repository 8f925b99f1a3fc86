//! HTTP JSON-RPC client for the two Ethereum methods the watcher consumes.
//!
//! The client carries no retry logic and no deadline of its own. Retry,
//! backoff, and the per-attempt timeout all belong to the fetch stage,
//! which knows whether a height is worth retrying at all; the head probe
//! runs untimed.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};
use crate::types::{parse_hex_u64, Block};

/// The chain-node operations consumed by the watcher pipeline.
#[async_trait]
pub trait EthereumRpc: Send + Sync {
    /// Current head block number (`eth_blockNumber`).
    async fn get_current_block_number(&self) -> Result<u64, TransportError>;

    /// Full block with transaction objects (`eth_getBlockByNumber(h, true)`).
    async fn get_block_by_number(&self, number: u64) -> Result<Block, TransportError>;
}

/// HTTP JSON-RPC client backed by `reqwest`.
pub struct HttpRpcClient {
    url: String,
    http: reqwest::Client,
}

impl HttpRpcClient {
    /// Create a new client for the given JSON-RPC endpoint URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
        }
    }

    async fn send(&self, req: JsonRpcRequest) -> Result<Value, TransportError> {
        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http(format!("HTTP {status}: {body}")));
        }

        let parsed = resp
            .json::<JsonRpcResponse>()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        parsed.into_result().map_err(TransportError::Rpc)
    }
}

#[async_trait]
impl EthereumRpc for HttpRpcClient {
    async fn get_current_block_number(&self) -> Result<u64, TransportError> {
        let req = JsonRpcRequest::new(1, "eth_blockNumber", vec![]);
        let result = self.send(req).await?;

        let hex: String = serde_json::from_value(result)?;
        Ok(parse_hex_u64(&hex)?)
    }

    async fn get_block_by_number(&self, number: u64) -> Result<Block, TransportError> {
        let req = JsonRpcRequest::new(
            1,
            "eth_getBlockByNumber",
            vec![json!(format!("0x{number:x}")), json!(true)],
        );
        let result = self.send(req).await?;

        Ok(serde_json::from_value(result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_number_request_shape() {
        let req = JsonRpcRequest::new(1, "eth_blockNumber", vec![]);
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"{"jsonrpc":"2.0","method":"eth_blockNumber","params":[],"id":1}"#
        );
    }

    #[test]
    fn get_block_request_shape() {
        let req = JsonRpcRequest::new(
            1,
            "eth_getBlockByNumber",
            vec![json!(format!("0x{:x}", 12345u64)), json!(true)],
        );
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"{"jsonrpc":"2.0","method":"eth_getBlockByNumber","params":["0x3039",true],"id":1}"#
        );
    }

    #[test]
    fn block_result_decodes() {
        let result = json!({
            "number": "0x10",
            "hash": "0xh",
            "transactions": [],
        });
        let block: Block = serde_json::from_value(result).unwrap();
        assert_eq!(block.number, "0x10");
        assert!(block.transactions.is_empty());
    }
}
