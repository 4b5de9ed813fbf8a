//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `AGORA_*` environment variable overrides.
//!
//! The contract address and expected chain id are both required for the
//! client to talk to the registry. When either is missing or invalid the
//! client still starts, but every read and write is refused with a
//! configuration message.

use serde::Deserialize;
#[cfg(feature = "native")]
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::chain::{Address, ChainId, ParseError};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub contract: ContractConfig,

    #[serde(default)]
    pub rpc: RpcConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Governance registry location
#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    /// Registry contract address (`0x…`)
    #[serde(default)]
    pub address: Option<String>,

    /// Network the registry is deployed on
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
}

fn default_chain_id() -> u64 {
    ChainId::SEPOLIA.0
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: None,
            chain_id: default_chain_id(),
        }
    }
}

/// A validated contract address on a specific network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractTarget {
    pub address: Address,
    pub chain_id: ChainId,
}

impl ContractConfig {
    /// Validate the configured address and chain id
    pub fn target(&self) -> Result<ContractTarget, ConfigError> {
        let raw = self
            .address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or(ConfigError::MissingContractAddress)?;

        let address = raw
            .parse::<Address>()
            .map_err(|reason| ConfigError::InvalidContractAddress {
                value: raw.to_string(),
                reason,
            })?;

        if self.chain_id == 0 {
            return Err(ConfigError::InvalidChainId(self.chain_id.to_string()));
        }

        Ok(ContractTarget {
            address,
            chain_id: ChainId(self.chain_id),
        })
    }
}

/// JSON-RPC endpoint and polling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_url")]
    pub url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Interval between receipt and event polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// How long to wait for a transaction to be mined
    #[serde(default = "default_receipt_timeout")]
    pub receipt_timeout_secs: u64,
}

/// Shortest accepted receipt and event poll interval
pub const MIN_POLL_INTERVAL_MS: u64 = 100;

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_request_timeout() -> u64 {
    10_000 // 10 seconds
}

fn default_poll_interval() -> u64 {
    4_000 // 4 seconds
}

fn default_receipt_timeout() -> u64 {
    300 // 5 minutes
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            request_timeout_ms: default_request_timeout(),
            poll_interval_ms: default_poll_interval(),
            receipt_timeout_secs: default_receipt_timeout(),
        }
    }
}

impl RpcConfig {
    /// Poll interval, never shorter than [`MIN_POLL_INTERVAL_MS`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs.max(1))
    }

    /// Reject timings that would flood the provider or never wait
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(ConfigError::InvalidRpcSetting {
                field: "poll_interval_ms",
                reason: format!("must be at least {}", MIN_POLL_INTERVAL_MS),
            });
        }
        if self.receipt_timeout_secs == 0 {
            return Err(ConfigError::InvalidRpcSetting {
                field: "receipt_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidRpcSetting {
                field: "request_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Accepts decimal (`11155111`) or hex quantity (`0xaa36a7`) chain ids
pub fn parse_chain_id(value: &str) -> Option<u64> {
    let value = value.trim();
    match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

impl Config {
    /// Load configuration from a file
    #[cfg(feature = "native")]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check settings that have no usable fallback
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rpc.validate()
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    #[cfg(feature = "native")]
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    #[cfg(feature = "native")]
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("agora").join("config.toml")),
            Some(PathBuf::from("./agora.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply `AGORA_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Contract overrides
        if let Some(address) = lookup("AGORA_CONTRACT_ADDRESS") {
            self.contract.address = Some(address);
        }
        if let Some(chain_id) = lookup("AGORA_CHAIN_ID") {
            match parse_chain_id(&chain_id) {
                Some(id) => self.contract.chain_id = id,
                None => tracing::warn!(value = %chain_id, "Ignoring invalid AGORA_CHAIN_ID"),
            }
        }

        // RPC overrides
        if let Some(url) = lookup("AGORA_RPC_URL") {
            self.rpc.url = url;
        }

        // Logging overrides
        if let Some(level) = lookup("AGORA_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("AGORA_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Contract address is not configured. Set AGORA_CONTRACT_ADDRESS and connect the wallet.")]
    MissingContractAddress,

    #[error("Invalid contract address {value:?}: {reason}")]
    InvalidContractAddress { value: String, reason: ParseError },

    #[error("Invalid chain id: {0}")]
    InvalidChainId(String),

    #[error("Invalid rpc.{field}: {reason}")]
    InvalidRpcSetting { field: &'static str, reason: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Agora Configuration
#
# Environment variables override these settings:
# - AGORA_CONTRACT_ADDRESS
# - AGORA_CHAIN_ID
# - AGORA_RPC_URL
# - AGORA_LOG_LEVEL
# - AGORA_LOG_FORMAT

[contract]
# Governance registry address (required)
# address = "0x0000000000000000000000000000000000000000"

# Network the registry is deployed on (11155111 = Sepolia)
chain_id = 11155111

[rpc]
# JSON-RPC endpoint of a node with unlocked accounts
url = "http://127.0.0.1:8545"

# Request timeout in milliseconds
request_timeout_ms = 10000

# How often to poll for receipts and new proposals (ms)
poll_interval_ms = 4000

# How long to wait for a submitted proposal to be mined (seconds)
receipt_timeout_secs = 300

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const REGISTRY: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.contract.address, None);
        assert_eq!(config.contract.chain_id, 11_155_111);
        assert_eq!(config.rpc.url, "http://127.0.0.1:8545");
        assert_eq!(config.rpc.poll_interval(), Duration::from_secs(4));
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_missing_address_is_a_config_error() {
        let config = ContractConfig::default();
        assert!(matches!(config.target(), Err(ConfigError::MissingContractAddress)));

        let blank = ContractConfig {
            address: Some("  ".to_string()),
            ..ContractConfig::default()
        };
        assert!(matches!(blank.target(), Err(ConfigError::MissingContractAddress)));
    }

    #[test]
    fn test_invalid_address_and_chain() {
        let bad = ContractConfig {
            address: Some("0x1234".to_string()),
            ..ContractConfig::default()
        };
        assert!(matches!(
            bad.target(),
            Err(ConfigError::InvalidContractAddress { .. })
        ));

        let zero_chain = ContractConfig {
            address: Some(REGISTRY.to_string()),
            chain_id: 0,
        };
        assert!(matches!(zero_chain.target(), Err(ConfigError::InvalidChainId(_))));
    }

    #[test]
    fn test_valid_target() {
        let config = ContractConfig {
            address: Some(REGISTRY.to_string()),
            chain_id: 31337,
        };
        let target = config.target().unwrap();
        assert_eq!(target.address.to_string(), REGISTRY);
        assert_eq!(target.chain_id, ChainId(31337));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("AGORA_CONTRACT_ADDRESS", REGISTRY),
            ("AGORA_CHAIN_ID", "0x7a69"),
            ("AGORA_RPC_URL", "http://node:8545"),
            ("AGORA_LOG_FORMAT", "json"),
        ]);

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.contract.address.as_deref(), Some(REGISTRY));
        assert_eq!(config.contract.chain_id, 31337);
        assert_eq!(config.rpc.url, "http://node:8545");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_chain_override_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| (key == "AGORA_CHAIN_ID").then(|| "sepolia".to_string()));
        assert_eq!(config.contract.chain_id, 11_155_111);
    }

    #[test]
    fn test_parse_chain_id() {
        assert_eq!(parse_chain_id("1"), Some(1));
        assert_eq!(parse_chain_id(" 0xaa36a7 "), Some(11_155_111));
        assert_eq!(parse_chain_id("mainnet"), None);
    }

    #[cfg(feature = "native")]
    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agora.toml");
        std::fs::write(
            &path,
            format!(
                "[contract]\naddress = \"{}\"\nchain_id = 31337\n\n[rpc]\npoll_interval_ms = 250\n",
                REGISTRY
            ),
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.contract.chain_id, 31337);
        assert_eq!(config.rpc.poll_interval_ms, 250);
        assert_eq!(config.rpc.receipt_timeout_secs, 300);
        assert!(config.contract.target().is_ok());
    }

    #[test]
    fn test_poll_timings_validated() {
        assert!(RpcConfig::default().validate().is_ok());

        let zero_poll = RpcConfig {
            poll_interval_ms: 0,
            ..RpcConfig::default()
        };
        assert!(matches!(
            zero_poll.validate(),
            Err(ConfigError::InvalidRpcSetting { field: "poll_interval_ms", .. })
        ));
        assert_eq!(
            zero_poll.poll_interval(),
            Duration::from_millis(MIN_POLL_INTERVAL_MS)
        );

        let zero_timeout = RpcConfig {
            receipt_timeout_secs: 0,
            ..RpcConfig::default()
        };
        assert!(matches!(
            zero_timeout.validate(),
            Err(ConfigError::InvalidRpcSetting { field: "receipt_timeout_secs", .. })
        ));
        assert_eq!(zero_timeout.receipt_timeout(), Duration::from_secs(1));
    }

    #[cfg(feature = "native")]
    #[test]
    fn test_zero_poll_interval_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agora.toml");
        std::fs::write(&path, "[rpc]
poll_interval_ms = 0
").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRpcSetting { .. }));
        assert_eq!(
            err.to_string(),
            "Invalid rpc.poll_interval_ms: must be at least 100"
        );
    }

    #[cfg(feature = "native")]
    #[test]
    fn test_default_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.contract.chain_id, 11_155_111);
        assert!(config.contract.address.is_none());
    }

    #[cfg(feature = "native")]
    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(Config::load(&missing), Err(ConfigError::Io { .. })));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[contract\n").unwrap();
        assert!(matches!(Config::load(&broken), Err(ConfigError::Parse { .. })));
    }
}
