//! Wallet Connector
//!
//! Requests account access from the injected wallet provider and exposes
//! the active account. There is no disconnect flow: once an account is
//! authorized it stays for the lifetime of the session.

use std::sync::Arc;

use crate::chain::Address;
use crate::wallet::{WalletError, WalletProvider};

/// Requests account access from an optional wallet provider
pub struct WalletConnector<W> {
    wallet: Option<Arc<W>>,
}

impl<W> Clone for WalletConnector<W> {
    fn clone(&self) -> Self {
        Self {
            wallet: self.wallet.clone(),
        }
    }
}

impl<W: WalletProvider> WalletConnector<W> {
    /// `None` models a browser without an injected provider
    pub fn new(wallet: Option<Arc<W>>) -> Self {
        Self { wallet }
    }

    pub fn is_available(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn wallet(&self) -> Option<&Arc<W>> {
        self.wallet.as_ref()
    }

    /// Ask the wallet for account permission
    ///
    /// Returns the first authorized address. A rejected prompt, or a wallet
    /// that authorizes no account at all, yields `Ok(None)` so the caller
    /// leaves its state untouched.
    pub async fn connect(&self) -> Result<Option<Address>, WalletError> {
        let wallet = self.wallet.as_ref().ok_or(WalletError::ProviderNotFound)?;

        match wallet.request_accounts().await {
            Ok(accounts) => {
                let account = accounts.first().copied();
                match account {
                    Some(account) => tracing::info!(account = %account, "Wallet connected"),
                    None => tracing::debug!("Wallet returned no accounts"),
                }
                Ok(account)
            }
            Err(WalletError::UserRejected) => {
                tracing::debug!("Account request rejected by user");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
