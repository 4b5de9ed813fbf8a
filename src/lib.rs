//! # Agora
//!
//! Governance proposal client - connect a wallet, submit proposals to a
//! fixed registry contract and browse what has been submitted.
//!
//! ## Features
//!
//! - **Wallet-agnostic**: everything talks to an EIP-1193 style [`WalletProvider`]
//! - **Guarded access**: network and deployment checks before every read and write
//! - **Live updates**: `ProposalCreated` events re-fetch the list
//! - **Portable core**: the same components drive the CLI and the `agora-ui` web app
//!
//! ## Modules
//!
//! - [`chain`]: addresses, wire encodings and the registry ABI
//! - [`wallet`]: provider trait with JSON-RPC and simulated adapters
//! - [`connector`]: account access
//! - [`guard`]: network and contract code checks
//! - [`gateway`]: registry reads, writes and creation events
//! - [`form`] / [`list`]: proposal form state machine and list view
//! - [`app`]: the application shell tying it together
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agora::{Config, GovernanceApp, MemoryWallet};
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env();
//!     let wallet = Arc::new(MemoryWallet::new(agora::ChainId(config.contract.chain_id)));
//!
//!     let mut app = GovernanceApp::new(&config, Some(wallet));
//!     app.start().await?;
//!     app.connect().await?;
//!
//!     app.form_mut().set_title("Fund the documentation");
//!     app.form_mut().set_description("Hire a technical writer for six months");
//!     app.submit().await?;
//!
//!     for card in app.cards() {
//!         println!("{} ({})", card.title, card.byline);
//!     }
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod chain;
pub mod config;
pub mod connector;
pub mod error;
pub mod form;
pub mod gateway;
pub mod guard;
pub mod list;
pub mod render;
pub mod session;
pub mod wallet;

// Re-export top-level types for convenience
pub use app::GovernanceApp;

pub use chain::{Address, ChainId, Proposal, ProposalCreated, TransactionReceipt, TxHash};

pub use config::{Config, ConfigError, ContractTarget};

pub use connector::WalletConnector;

pub use error::{AppError, AppResult, ErrorKind, Surface};

pub use form::{FormError, FormState, ProposalDraft, ProposalForm, SubmitTicket};

pub use gateway::{
    ContractGateway, EventHub, GatewayError, GatewayResult, GatewaySettings, Subscription,
};

pub use guard::{ChainGuard, GuardError};

pub use list::{ProposalCard, ProposalListView};

pub use session::{Session, Severity, StatusMessage};

pub use wallet::{MemoryWallet, WalletError, WalletProvider};
