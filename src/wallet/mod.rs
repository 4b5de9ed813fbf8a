//! Wallet Provider Interface
//!
//! Every interaction with the chain goes through an EIP-1193 style
//! `request(method, params)` call. Typed helpers on [`WalletProvider`]
//! build the JSON-RPC payloads and parse the results, so an adapter only
//! has to move JSON.
//!
//! ## Adapters
//!
//! - [`JsonRpcWallet`]: HTTP JSON-RPC node with node-managed accounts (native only)
//! - [`MemoryWallet`]: in-process simulated chain hosting the registry contract
//!
//! The browser adapter over `window.ethereum` lives in the `agora-ui` crate.
//!
//! Futures are not required to be `Send`: the browser provider is a
//! JavaScript object and the whole client runs on a single thread.

mod memory;
#[cfg(feature = "native")]
mod rpc;

pub use memory::MemoryWallet;
#[cfg(feature = "native")]
pub use rpc::JsonRpcWallet;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::chain::{
    abi, parse_data, parse_quantity, parse_word, to_data, to_quantity, Address, ChainId, Log,
    ParseError, TransactionReceipt, TxHash,
};

/// EIP-1193: the user rejected the request
pub const CODE_USER_REJECTED: i64 = 4001;
/// EIP-1193: the requested method/account has not been authorized
pub const CODE_UNAUTHORIZED: i64 = 4100;
/// EIP-1193: the provider does not support the method
pub const CODE_UNSUPPORTED_METHOD: i64 = 4200;
/// EIP-1193: the provider is disconnected from all chains
pub const CODE_DISCONNECTED: i64 = 4900;
/// EIP-1193: the provider is not connected to the requested chain
pub const CODE_CHAIN_DISCONNECTED: i64 = 4901;
/// Wallet extension: the requested chain has not been added
pub const CODE_UNRECOGNIZED_CHAIN: i64 = 4902;
/// JSON-RPC: method not found
pub const CODE_METHOD_NOT_FOUND: i64 = -32601;
/// EIP-1474: execution reverted
pub const CODE_EXECUTION_REVERTED: i64 = 3;

/// Errors reported by a wallet provider
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("Wallet provider not found")]
    ProviderNotFound,

    #[error("Wallet provider unreachable: {0}")]
    Unavailable(String),

    #[error("User rejected the request")]
    UserRejected,

    #[error("Account not authorized: {0}")]
    Unauthorized(String),

    #[error("Requested chain is not configured in the wallet")]
    UnrecognizedChain,

    #[error("Method not supported: {0}")]
    UnsupportedMethod(String),

    #[error("Wallet disconnected")]
    Disconnected,

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Execution reverted{}", reason_suffix(.0))]
    Reverted(Option<String>),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(": {}", r))
        .unwrap_or_default()
}

impl WalletError {
    /// Map a JSON-RPC / EIP-1193 error object to a wallet error
    pub fn from_rpc(code: i64, message: &str, data: Option<&Value>) -> Self {
        let lowered = message.to_lowercase();
        match code {
            CODE_USER_REJECTED => WalletError::UserRejected,
            CODE_UNAUTHORIZED => WalletError::Unauthorized(message.to_string()),
            CODE_UNSUPPORTED_METHOD | CODE_METHOD_NOT_FOUND => {
                WalletError::UnsupportedMethod(message.to_string())
            }
            CODE_DISCONNECTED | CODE_CHAIN_DISCONNECTED => WalletError::Disconnected,
            CODE_UNRECOGNIZED_CHAIN => WalletError::UnrecognizedChain,
            _ if code == CODE_EXECUTION_REVERTED || lowered.contains("execution reverted") => {
                let reason = data
                    .and_then(Value::as_str)
                    .and_then(|d| parse_data(d).ok())
                    .and_then(|d| abi::decode_revert_reason(&d))
                    .or_else(|| {
                        message
                            .split_once("execution reverted: ")
                            .map(|(_, r)| r.to_string())
                    });
                WalletError::Reverted(reason)
            }
            _ if lowered.contains("insufficient funds") => {
                WalletError::InsufficientFunds(message.to_string())
            }
            _ => WalletError::Rpc {
                code,
                message: message.to_string(),
            },
        }
    }

    /// Whether the provider lacks the method (used for fallbacks)
    pub fn is_unsupported_method(&self) -> bool {
        matches!(self, WalletError::UnsupportedMethod(_))
    }

    /// JSON-RPC error code for this error (used by in-process providers)
    pub fn code(&self) -> i64 {
        match self {
            WalletError::UserRejected => CODE_USER_REJECTED,
            WalletError::Unauthorized(_) => CODE_UNAUTHORIZED,
            WalletError::UnsupportedMethod(_) => CODE_UNSUPPORTED_METHOD,
            WalletError::Disconnected => CODE_DISCONNECTED,
            WalletError::UnrecognizedChain => CODE_UNRECOGNIZED_CHAIN,
            WalletError::Reverted(_) => CODE_EXECUTION_REVERTED,
            WalletError::Rpc { code, .. } => *code,
            _ => -32000,
        }
    }
}

impl From<ParseError> for WalletError {
    fn from(err: ParseError) -> Self {
        WalletError::InvalidResponse(err.to_string())
    }
}

/// A state-changing call to submit through the wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub data: Vec<u8>,
}

impl TransactionRequest {
    fn to_json(&self) -> Value {
        json!({
            "from": self.from.to_lower_hex(),
            "to": self.to.to_lower_hex(),
            "data": to_data(&self.data),
        })
    }
}

/// Log query for a single contract and event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub topic0: [u8; 32],
    pub from_block: u64,
    pub to_block: u64,
}

impl LogFilter {
    fn to_json(&self) -> Value {
        json!({
            "address": self.address.to_lower_hex(),
            "topics": [to_data(&self.topic0)],
            "fromBlock": to_quantity(self.from_block),
            "toBlock": to_quantity(self.to_block),
        })
    }
}

/// EIP-1193 wallet provider
///
/// Implementors supply [`request`](WalletProvider::request) and
/// [`pause`](WalletProvider::pause); everything else is derived.
#[async_trait(?Send)]
pub trait WalletProvider {
    /// Issue a raw EIP-1193 request
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError>;

    /// Wait between receipt polls
    async fn pause(&self, interval: Duration);

    /// Ask the wallet for account access (`eth_requestAccounts`)
    ///
    /// Providers without the method (plain nodes) fall back to `eth_accounts`.
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        let value = match self.request("eth_requestAccounts", json!([])).await {
            Err(e) if e.is_unsupported_method() => self.request("eth_accounts", json!([])).await?,
            other => other?,
        };
        let accounts: Vec<String> = serde_json::from_value(value)
            .map_err(|e| WalletError::InvalidResponse(e.to_string()))?;
        accounts
            .iter()
            .map(|a| a.parse().map_err(WalletError::from))
            .collect()
    }

    /// Active network (`eth_chainId`)
    async fn chain_id(&self) -> Result<ChainId, WalletError> {
        let value = self.request("eth_chainId", json!([])).await?;
        Ok(ChainId::from_quantity(expect_str(&value, "chain id")?)?)
    }

    /// Ask the wallet to switch networks (`wallet_switchEthereumChain`)
    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), WalletError> {
        self.request(
            "wallet_switchEthereumChain",
            json!([{ "chainId": chain_id.to_quantity() }]),
        )
        .await?;
        Ok(())
    }

    /// Deployed bytecode at `address` (`eth_getCode`), empty for accounts
    async fn get_code(&self, address: &Address) -> Result<Vec<u8>, WalletError> {
        let value = self
            .request("eth_getCode", json!([address.to_lower_hex(), "latest"]))
            .await?;
        Ok(parse_data(expect_str(&value, "code")?)?)
    }

    /// Read-only contract call (`eth_call`)
    async fn call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>, WalletError> {
        let value = self
            .request(
                "eth_call",
                json!([{ "to": to.to_lower_hex(), "data": to_data(data) }, "latest"]),
            )
            .await?;
        Ok(parse_data(expect_str(&value, "call result")?)?)
    }

    /// Submit a transaction for signing (`eth_sendTransaction`)
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxHash, WalletError> {
        let value = self
            .request("eth_sendTransaction", json!([tx.to_json()]))
            .await?;
        Ok(expect_str(&value, "transaction hash")?.parse()?)
    }

    /// Receipt of a mined transaction, `None` while pending
    async fn transaction_receipt(
        &self,
        hash: &TxHash,
    ) -> Result<Option<TransactionReceipt>, WalletError> {
        let value = self
            .request("eth_getTransactionReceipt", json!([hash.to_string()]))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        let raw: RpcReceipt = serde_json::from_value(value)
            .map_err(|e| WalletError::InvalidResponse(e.to_string()))?;
        raw.into_receipt().map(Some)
    }

    /// Latest block number (`eth_blockNumber`)
    async fn block_number(&self) -> Result<u64, WalletError> {
        let value = self.request("eth_blockNumber", json!([])).await?;
        Ok(parse_quantity(expect_str(&value, "block number")?)?)
    }

    /// Matching logs (`eth_getLogs`)
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, WalletError> {
        let value = self.request("eth_getLogs", json!([filter.to_json()])).await?;
        let raw: Vec<RpcLog> = serde_json::from_value(value)
            .map_err(|e| WalletError::InvalidResponse(e.to_string()))?;
        raw.into_iter().map(RpcLog::into_log).collect()
    }
}

fn expect_str<'a>(value: &'a Value, what: &str) -> Result<&'a str, WalletError> {
    value
        .as_str()
        .ok_or_else(|| WalletError::InvalidResponse(format!("expected {} string, got {}", what, value)))
}

// ============================================
// JSON-RPC result DTOs
// ============================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    block_number: Option<String>,
    /// Absent on pre-Byzantium chains
    #[serde(default)]
    status: Option<String>,
}

impl RpcReceipt {
    fn into_receipt(self) -> Result<TransactionReceipt, WalletError> {
        let block_number = self
            .block_number
            .as_deref()
            .map(parse_quantity)
            .transpose()?
            .unwrap_or_default();
        let success = match self.status.as_deref() {
            Some(status) => parse_quantity(status)? == 1,
            None => true,
        };
        Ok(TransactionReceipt {
            transaction_hash: self.transaction_hash.parse()?,
            block_number,
            success,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: String,
    topics: Vec<String>,
    data: String,
    block_number: Option<String>,
}

impl RpcLog {
    fn into_log(self) -> Result<Log, WalletError> {
        Ok(Log {
            address: self.address.parse()?,
            topics: self
                .topics
                .iter()
                .map(|t| parse_word(t))
                .collect::<Result<_, _>>()?,
            data: parse_data(&self.data)?,
            block_number: self
                .block_number
                .as_deref()
                .map(parse_quantity)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            WalletError::from_rpc(4001, "User rejected the request.", None),
            WalletError::UserRejected
        );
        assert_eq!(
            WalletError::from_rpc(4902, "Unrecognized chain ID", None),
            WalletError::UnrecognizedChain
        );
        assert!(WalletError::from_rpc(-32601, "the method eth_requestAccounts does not exist", None)
            .is_unsupported_method());
        assert!(matches!(
            WalletError::from_rpc(-32000, "insufficient funds for gas * price + value", None),
            WalletError::InsufficientFunds(_)
        ));
        assert!(matches!(
            WalletError::from_rpc(-32000, "nonce too low", None),
            WalletError::Rpc { code: -32000, .. }
        ));
    }

    #[test]
    fn test_revert_reason_from_data() {
        let data = Value::String(to_data(&abi::encode_revert_reason("title required")));
        let err = WalletError::from_rpc(3, "execution reverted", Some(&data));
        assert_eq!(err, WalletError::Reverted(Some("title required".to_string())));
        assert_eq!(err.to_string(), "Execution reverted: title required");
    }

    #[test]
    fn test_revert_reason_from_message() {
        let err = WalletError::from_rpc(-32603, "execution reverted: paused", None);
        assert_eq!(err, WalletError::Reverted(Some("paused".to_string())));

        let bare = WalletError::from_rpc(3, "execution reverted", None);
        assert_eq!(bare.to_string(), "Execution reverted");
    }

    #[test]
    fn test_code_roundtrip() {
        for err in [
            WalletError::UserRejected,
            WalletError::UnrecognizedChain,
            WalletError::Disconnected,
            WalletError::Reverted(None),
        ] {
            assert_eq!(WalletError::from_rpc(err.code(), "", None), err);
        }
    }

    #[test]
    fn test_receipt_parsing() {
        let raw: RpcReceipt = serde_json::from_value(json!({
            "transactionHash": format!("0x{}", "ab".repeat(32)),
            "blockNumber": "0x10",
            "status": "0x0",
        }))
        .unwrap();
        let receipt = raw.into_receipt().unwrap();
        assert_eq!(receipt.block_number, 16);
        assert!(!receipt.success);
    }

    #[test]
    fn test_log_parsing() {
        let raw: RpcLog = serde_json::from_value(json!({
            "address": "0x2222222222222222222222222222222222222222",
            "topics": [format!("0x{}", "00".repeat(32))],
            "data": "0x",
            "blockNumber": "0x2a",
        }))
        .unwrap();
        let log = raw.into_log().unwrap();
        assert_eq!(log.address, Address::new([0x22; 20]));
        assert_eq!(log.topics, vec![[0u8; 32]]);
        assert!(log.data.is_empty());
        assert_eq!(log.block_number, 42);
    }

    #[test]
    fn test_request_payloads() {
        let tx = TransactionRequest {
            from: Address::new([0x11; 20]),
            to: Address::new([0x22; 20]),
            data: vec![0xab, 0xcd],
        };
        let json = tx.to_json();
        assert_eq!(json["from"], "0x1111111111111111111111111111111111111111");
        assert_eq!(json["data"], "0xabcd");

        let filter = LogFilter {
            address: Address::new([0x22; 20]),
            topic0: [0u8; 32],
            from_block: 1,
            to_block: 26,
        };
        let json = filter.to_json();
        assert_eq!(json["fromBlock"], "0x1");
        assert_eq!(json["toBlock"], "0x1a");
    }
}
