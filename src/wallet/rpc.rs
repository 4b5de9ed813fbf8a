//! JSON-RPC Wallet
//!
//! HTTP client that speaks Ethereum JSON-RPC to a node holding unlocked
//! accounts (a development node such as anvil or a local geth instance).
//! Signing happens on the node, which makes it the server-side counterpart
//! of a browser wallet extension.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{WalletError, WalletProvider};
use crate::config::RpcConfig;

/// Wallet backed by a JSON-RPC endpoint
pub struct JsonRpcWallet {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcWallet {
    /// Create a new JSON-RPC wallet for the configured endpoint
    pub fn new(config: &RpcConfig) -> Result<Self, WalletError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| WalletError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait(?Send)]
impl WalletProvider for JsonRpcWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        tracing::debug!(id, method, "JSON-RPC request");

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WalletError::Timeout
                } else if e.is_connect() {
                    WalletError::Unavailable(self.url.clone())
                } else {
                    WalletError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(WalletError::Transport(format!("HTTP {}: {}", status.as_u16(), text)));
        }

        let reply: RpcResponse = response
            .json()
            .await
            .map_err(|e| WalletError::InvalidResponse(e.to_string()))?;

        if let Some(error) = reply.error {
            tracing::debug!(id, method, code = error.code, error_message = %error.message, "JSON-RPC error");
            return Err(WalletError::from_rpc(
                error.code,
                &error.message,
                error.data.as_ref(),
            ));
        }

        Ok(reply.result.unwrap_or(Value::Null))
    }

    async fn pause(&self, interval: Duration) {
        tokio::time::sleep(interval).await;
    }
}

// ============================================
// Request/Response DTOs
// ============================================

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainId;

    #[test]
    fn test_request_shape() {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: 7,
            method: "eth_chainId",
            params: serde_json::json!([]),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 7);
        assert_eq!(json["method"], "eth_chainId");
    }

    #[test]
    fn test_error_response_parsing() {
        let reply: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":4001,"message":"User rejected the request."}}"#,
        )
        .unwrap();
        let error = reply.error.unwrap();
        assert_eq!(
            WalletError::from_rpc(error.code, &error.message, error.data.as_ref()),
            WalletError::UserRejected
        );
    }

    #[test]
    fn test_null_result_is_kept() {
        let reply: RpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert!(reply.error.is_none());
        assert!(reply.result.unwrap_or(Value::Null).is_null());
    }

    #[tokio::test]
    async fn test_unreachable_node() {
        let config = RpcConfig {
            // Reserved port, nothing listens here
            url: "http://127.0.0.1:9".to_string(),
            request_timeout_ms: 2000,
            ..RpcConfig::default()
        };
        let wallet = JsonRpcWallet::new(&config).unwrap();
        let err = wallet.chain_id().await.map(|_: ChainId| ()).unwrap_err();
        assert!(matches!(
            err,
            WalletError::Unavailable(_) | WalletError::Timeout | WalletError::Transport(_)
        ));
    }
}
