//! Application Error Types
//!
//! Every component error is folded into [`AppError`] at the operation
//! boundary in [`GovernanceApp`](crate::GovernanceApp). Each variant maps to
//! an [`ErrorKind`] and to the [`Surface`] it is shown on. None of them are
//! retried and none are fatal.

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::gateway::GatewayError;
use crate::guard::GuardError;
use crate::session::Severity;
use crate::wallet::WalletError;

/// Fallback text for a failed write without any usable message
pub const WRITE_FAILURE_FALLBACK: &str = "transaction failed";

/// Application error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Contract address or chain id missing or invalid
    #[error("{0}")]
    Config(String),

    /// No wallet, or the node/provider is unreachable
    #[error("{0}")]
    Connectivity(String),

    /// Account access or network switch refused
    #[error("{0}")]
    Authorization(String),

    /// Missing contract code or reverted execution
    #[error("{0}")]
    OnChain(String),

    /// Read failure worth retrying by hand
    #[error("{0}")]
    Transient(String),

    /// Wallet-reported write failure
    #[error("{0}")]
    Wallet(String),
}

pub type AppResult<T> = Result<T, AppError>;

/// Error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Config,
    Connectivity,
    Authorization,
    OnChain,
    Transient,
    Wallet,
}

/// Where an error is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Transient status banner
    Status,
    /// Blocking notice
    Alert,
}

impl Surface {
    pub fn severity(self) -> Severity {
        match self {
            Surface::Status => Severity::Warning,
            Surface::Alert => Severity::Alert,
        }
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Config(_) => ErrorKind::Config,
            AppError::Connectivity(_) => ErrorKind::Connectivity,
            AppError::Authorization(_) => ErrorKind::Authorization,
            AppError::OnChain(_) => ErrorKind::OnChain,
            AppError::Transient(_) => ErrorKind::Transient,
            AppError::Wallet(_) => ErrorKind::Wallet,
        }
    }

    pub fn surface(&self) -> Surface {
        match self {
            AppError::Wallet(_) => Surface::Alert,
            _ => Surface::Status,
        }
    }

    /// Classify an error raised while writing
    ///
    /// Wallet failures during the send or the receipt wait become
    /// [`AppError::Wallet`] with the friendliest text available.
    pub fn from_write(err: GatewayError) -> Self {
        match err {
            GatewayError::Write(e) => AppError::Wallet(write_failure_text(&e)),
            GatewayError::Reverted(_) => AppError::OnChain(err.to_string()),
            other => AppError::from(other),
        }
    }
}

/// Display text for a failed write
///
/// Prefers the wallet's short message, then its raw message, then
/// [`WRITE_FAILURE_FALLBACK`].
pub fn write_failure_text(err: &WalletError) -> String {
    let short = match err {
        WalletError::UserRejected => Some("User rejected the request".to_string()),
        WalletError::InsufficientFunds(_) => Some("Insufficient funds".to_string()),
        WalletError::Reverted(Some(reason)) => Some(format!("Execution reverted: {}", reason)),
        WalletError::Rpc { message, .. } => Some(message.clone()),
        _ => None,
    };
    let raw = match err {
        WalletError::Rpc { message, .. } => message.clone(),
        other => other.to_string(),
    };

    short
        .filter(|s| !s.trim().is_empty())
        .or_else(|| Some(raw).filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| WRITE_FAILURE_FALLBACK.to_string())
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<WalletError> for AppError {
    fn from(err: WalletError) -> Self {
        let message = err.to_string();
        match err {
            WalletError::ProviderNotFound
            | WalletError::Unavailable(_)
            | WalletError::Transport(_)
            | WalletError::Timeout
            | WalletError::Disconnected => AppError::Connectivity(message),
            WalletError::UserRejected
            | WalletError::Unauthorized(_)
            | WalletError::UnrecognizedChain => AppError::Authorization(message),
            WalletError::Reverted(_) => AppError::OnChain(message),
            WalletError::UnsupportedMethod(_)
            | WalletError::InsufficientFunds(_)
            | WalletError::Rpc { .. }
            | WalletError::InvalidResponse(_) => AppError::Transient(message),
        }
    }
}

impl From<GuardError> for AppError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::NotConfigured(e) => e.into(),
            GuardError::WrongNetwork { .. } => AppError::Authorization(err.to_string()),
            GuardError::NoContractCode { .. } => AppError::OnChain(err.to_string()),
            GuardError::Wallet(e) => e.into(),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Guard(e) => e.into(),
            GatewayError::Read(ref e) | GatewayError::Events(ref e) => match AppError::from(e.clone()) {
                AppError::Connectivity(m) => AppError::Connectivity(m),
                _ => AppError::Transient(err.to_string()),
            },
            GatewayError::Write(e) => e.into(),
            GatewayError::Reverted(_) => AppError::OnChain(err.to_string()),
            GatewayError::Decode(_) | GatewayError::ReceiptTimeout { .. } => {
                AppError::Transient(err.to_string())
            }
        }
    }
}
