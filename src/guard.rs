//! Chain Guard
//!
//! Verifies, before every read and write, that the wallet is on the
//! expected network and that the configured registry address actually has
//! deployed code there.

use std::sync::Arc;
use thiserror::Error;

use crate::chain::{Address, ChainId};
use crate::config::{ConfigError, ContractTarget};
use crate::wallet::{WalletError, WalletProvider};

/// Reasons the client is not ready to talk to the registry
#[derive(Debug, Clone, Error)]
pub enum GuardError {
    #[error("{0}")]
    NotConfigured(#[from] ConfigError),

    #[error("Switch the wallet network to chain id {expected}.")]
    WrongNetwork {
        expected: ChainId,
        actual: ChainId,
        #[source]
        source: WalletError,
    },

    #[error("No contract code at {address} on the current network. Check the deployment and configuration.")]
    NoContractCode { address: Address, chain_id: ChainId },

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

/// Network and deployment check for a single registry
pub struct ChainGuard<W> {
    wallet: Arc<W>,
    target: Result<ContractTarget, ConfigError>,
}

impl<W: WalletProvider> ChainGuard<W> {
    pub fn new(wallet: Arc<W>, target: Result<ContractTarget, ConfigError>) -> Self {
        Self { wallet, target }
    }

    /// Configured target, without touching the provider
    pub fn target(&self) -> Result<ContractTarget, ConfigError> {
        self.target.clone()
    }

    /// Make sure the registry is reachable on the wallet's network
    ///
    /// Performs no provider call when the target is not configured, and at
    /// most one network switch request per call.
    pub async fn ensure_ready(&self) -> Result<ContractTarget, GuardError> {
        let target = self.target()?;

        let actual = self.wallet.chain_id().await?;
        if actual != target.chain_id {
            tracing::info!(
                expected = %target.chain_id,
                actual = %actual,
                "Requesting network switch"
            );
            if let Err(source) = self.wallet.switch_chain(target.chain_id).await {
                tracing::warn!(error = %source, "Network switch failed");
                return Err(GuardError::WrongNetwork {
                    expected: target.chain_id,
                    actual,
                    source,
                });
            }
        }

        let code = self.wallet.get_code(&target.address).await?;
        if code.is_empty() {
            return Err(GuardError::NoContractCode {
                address: target.address,
                chain_id: target.chain_id,
            });
        }

        tracing::trace!(address = %target.address, "Chain guard passed");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::MemoryWallet;

    fn registry() -> Address {
        Address::new([0x22; 20])
    }

    fn target() -> ContractTarget {
        ContractTarget {
            address: registry(),
            chain_id: ChainId::SEPOLIA,
        }
    }

    fn deployed() -> MemoryWallet {
        let wallet = MemoryWallet::new(ChainId::SEPOLIA);
        wallet.deploy_registry(registry());
        wallet
    }

    #[tokio::test]
    async fn test_unconfigured_makes_no_calls() {
        let wallet = Arc::new(deployed());
        let guard = ChainGuard::new(wallet.clone(), Err(ConfigError::MissingContractAddress));

        let err = guard.ensure_ready().await.unwrap_err();
        assert!(matches!(err, GuardError::NotConfigured(_)));
        assert!(err.to_string().contains("AGORA_CONTRACT_ADDRESS"));
        assert!(wallet.requests().is_empty());
    }

    #[tokio::test]
    async fn test_ready_on_expected_network() {
        let wallet = Arc::new(deployed());
        let guard = ChainGuard::new(wallet.clone(), Ok(target()));

        assert_eq!(guard.ensure_ready().await.unwrap(), target());
        assert_eq!(wallet.requests(), vec!["eth_chainId", "eth_getCode"]);
    }

    #[tokio::test]
    async fn test_switches_network_once() {
        let wallet = Arc::new(deployed());
        wallet.switch_network(ChainId::MAINNET);
        let guard = ChainGuard::new(wallet.clone(), Ok(target()));

        guard.ensure_ready().await.unwrap();
        assert_eq!(wallet.request_count("wallet_switchEthereumChain"), 1);
        assert_eq!(wallet.chain_id().await.unwrap(), ChainId::SEPOLIA);
    }

    #[tokio::test]
    async fn test_declined_switch_aborts() {
        let wallet = Arc::new(deployed());
        wallet.switch_network(ChainId::MAINNET);
        wallet.set_decline_switch(true);
        let guard = ChainGuard::new(wallet.clone(), Ok(target()));

        let err = guard.ensure_ready().await.unwrap_err();
        assert_eq!(err.to_string(), "Switch the wallet network to chain id 11155111.");
        assert_eq!(wallet.request_count("wallet_switchEthereumChain"), 1);
        assert_eq!(wallet.request_count("eth_getCode"), 0);

        // A second attempt asks again, once
        guard.ensure_ready().await.unwrap_err();
        assert_eq!(wallet.request_count("wallet_switchEthereumChain"), 2);
    }

    #[tokio::test]
    async fn test_unknown_network_in_wallet() {
        let wallet = MemoryWallet::new(ChainId::MAINNET);
        let guard = ChainGuard::new(Arc::new(wallet), Ok(target()));

        match guard.ensure_ready().await {
            Err(GuardError::WrongNetwork { source, actual, .. }) => {
                assert_eq!(source, WalletError::UnrecognizedChain);
                assert_eq!(actual, ChainId::MAINNET);
            }
            other => panic!("expected WrongNetwork, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_code() {
        let wallet = Arc::new(MemoryWallet::new(ChainId::SEPOLIA));
        let guard = ChainGuard::new(wallet, Ok(target()));

        let err = guard.ensure_ready().await.unwrap_err();
        assert!(matches!(err, GuardError::NoContractCode { .. }));
        assert!(err.to_string().starts_with(&format!("No contract code at {}", registry())));
    }
}
