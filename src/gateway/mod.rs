//! Contract Gateway
//!
//! Wraps the governance registry's fixed ABI behind two operations: a
//! read-only proposal listing and a state-changing proposal creation that
//! waits for its receipt. Also owns the creation-event hub and the log
//! cursor used to feed it.
//!
//! Every read and write runs the [`ChainGuard`] first.

mod events;

pub use events::{EventHub, ListenerId, Subscription};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

use crate::chain::{abi, AbiError, Address, ChainId, Proposal, TransactionReceipt, TxHash};
use crate::config::{ConfigError, ContractTarget, RpcConfig, MIN_POLL_INTERVAL_MS};
use crate::guard::{ChainGuard, GuardError};
use crate::wallet::{LogFilter, TransactionRequest, WalletError, WalletProvider};

/// Gateway errors
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error("Failed to read proposals: {0}")]
    Read(#[source] WalletError),

    #[error("Malformed registry response: {0}")]
    Decode(#[from] AbiError),

    #[error("{0}")]
    Write(#[source] WalletError),

    #[error("Transaction {0} reverted")]
    Reverted(TxHash),

    #[error("Transaction {hash} not mined after {waited:?}")]
    ReceiptTimeout { hash: TxHash, waited: Duration },

    #[error("Failed to fetch proposal events: {0}")]
    Events(#[source] WalletError),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Polling behaviour for receipts and events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewaySettings {
    pub poll_interval: Duration,
    pub receipt_timeout: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self::from(&RpcConfig::default())
    }
}

impl From<&RpcConfig> for GatewaySettings {
    fn from(config: &RpcConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            receipt_timeout: config.receipt_timeout(),
        }
    }
}

impl GatewaySettings {
    /// Replace a zero poll interval with the shortest accepted one
    fn normalized(self) -> Self {
        let poll_interval = if self.poll_interval.is_zero() {
            Duration::from_millis(MIN_POLL_INTERVAL_MS)
        } else {
            self.poll_interval
        };
        Self {
            poll_interval,
            ..self
        }
    }

    /// Receipt polls allowed before giving up
    fn max_receipt_polls(&self) -> u64 {
        let interval = self.poll_interval.as_millis().max(1);
        let polls = self.receipt_timeout.as_millis() / interval;
        u64::try_from(polls).unwrap_or(u64::MAX).max(1)
    }
}

/// Provider-bound, non-signing view of the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadBinding {
    target: ContractTarget,
    signer: Option<Address>,
    list_calldata: Vec<u8>,
}

impl ReadBinding {
    fn derive(target: ContractTarget, signer: Option<Address>) -> Self {
        Self {
            target,
            signer,
            list_calldata: abi::encode_get_proposals(),
        }
    }

    pub fn target(&self) -> ContractTarget {
        self.target
    }

    fn matches(&self, target: &ContractTarget, signer: Option<Address>) -> bool {
        self.target == *target && self.signer == signer
    }
}

/// Registry binding authorized to submit transactions for one account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignerBinding {
    target: ContractTarget,
    signer: Address,
}

impl SignerBinding {
    pub fn new(target: ContractTarget, signer: Address) -> Self {
        Self { target, signer }
    }

    pub fn signer(&self) -> Address {
        self.signer
    }

    /// `createProposal(title, description)` transaction
    pub fn create_proposal(&self, title: &str, description: &str) -> TransactionRequest {
        TransactionRequest {
            from: self.signer,
            to: self.target.address,
            data: abi::encode_create_proposal(title, description),
        }
    }
}

/// Last block whose logs were dispatched, per network
#[derive(Debug, Clone, Copy)]
struct EventCursor {
    chain_id: ChainId,
    block: u64,
}

/// Registry access for one wallet and one configured target
pub struct ContractGateway<W> {
    wallet: Arc<W>,
    guard: ChainGuard<W>,
    settings: GatewaySettings,
    signer: Mutex<Option<Address>>,
    read_binding: Mutex<Option<ReadBinding>>,
    bindings_derived: AtomicU64,
    cursor: Mutex<Option<EventCursor>>,
    hub: EventHub,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<W: WalletProvider> ContractGateway<W> {
    pub fn new(
        wallet: Arc<W>,
        target: Result<ContractTarget, ConfigError>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            guard: ChainGuard::new(wallet.clone(), target),
            wallet,
            settings: settings.normalized(),
            signer: Mutex::new(None),
            read_binding: Mutex::new(None),
            bindings_derived: AtomicU64::new(0),
            cursor: Mutex::new(None),
            hub: EventHub::new(),
        }
    }

    pub fn wallet(&self) -> &Arc<W> {
        &self.wallet
    }

    pub fn settings(&self) -> GatewaySettings {
        self.settings
    }

    /// Configured target, without touching the provider
    pub fn target(&self) -> Result<ContractTarget, ConfigError> {
        self.guard.target()
    }

    /// Record the connected account
    pub fn set_signer(&self, signer: Option<Address>) {
        *lock(&self.signer) = signer;
    }

    pub fn signer(&self) -> Option<Address> {
        *lock(&self.signer)
    }

    /// Cached read binding, re-derived when the target or signer changes
    pub fn read_binding(&self, target: ContractTarget) -> ReadBinding {
        let signer = self.signer();
        let mut cached = lock(&self.read_binding);
        match cached.as_ref() {
            Some(binding) if binding.matches(&target, signer) => binding.clone(),
            _ => {
                let binding = ReadBinding::derive(target, signer);
                self.bindings_derived.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    address = %target.address,
                    chain_id = %target.chain_id,
                    "Derived registry read binding"
                );
                *cached = Some(binding.clone());
                binding
            }
        }
    }

    /// How many read bindings have been derived
    pub fn bindings_derived(&self) -> u64 {
        self.bindings_derived.load(Ordering::Relaxed)
    }

    /// All proposals, in contract append order
    pub async fn list_proposals(&self) -> GatewayResult<Vec<Proposal>> {
        let target = self.guard.ensure_ready().await?;
        let binding = self.read_binding(target);

        let data = self
            .wallet
            .call(&binding.target.address, &binding.list_calldata)
            .await
            .map_err(GatewayError::Read)?;
        let proposals = abi::decode_proposals(&data)?;

        tracing::debug!(count = proposals.len(), "Fetched proposals");
        Ok(proposals)
    }

    /// Submit `createProposal` from `signer` and wait until it is mined
    pub async fn create_proposal(
        &self,
        signer: Address,
        title: &str,
        description: &str,
    ) -> GatewayResult<TransactionReceipt> {
        let target = self.guard.ensure_ready().await?;
        let binding = SignerBinding::new(target, signer);
        let tx = binding.create_proposal(title.trim(), description.trim());

        tracing::info!(
            signer = %signer,
            registry = %target.address,
            "Submitting proposal"
        );
        let hash = self
            .wallet
            .send_transaction(&tx)
            .await
            .map_err(GatewayError::Write)?;
        tracing::info!(tx_hash = %hash, "Proposal transaction sent");

        let receipt = self.wait_for_receipt(&hash).await?;
        if !receipt.success {
            tracing::warn!(tx_hash = %hash, "Proposal transaction reverted");
            return Err(GatewayError::Reverted(hash));
        }

        tracing::info!(
            tx_hash = %hash,
            block = receipt.block_number,
            "Proposal transaction mined"
        );
        Ok(receipt)
    }

    async fn wait_for_receipt(&self, hash: &TxHash) -> GatewayResult<TransactionReceipt> {
        let max_polls = self.settings.max_receipt_polls();

        for attempt in 0..=max_polls {
            if let Some(receipt) = self
                .wallet
                .transaction_receipt(hash)
                .await
                .map_err(GatewayError::Write)?
            {
                return Ok(receipt);
            }
            if attempt < max_polls {
                self.wallet.pause(self.settings.poll_interval).await;
            }
        }

        Err(GatewayError::ReceiptTimeout {
            hash: *hash,
            waited: self.settings.receipt_timeout,
        })
    }

    /// Register a creation-event listener
    pub fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.hub.listener_count()
    }

    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    /// Start delivering only events mined after the current block
    ///
    /// The head is only read on the configured network. Elsewhere the
    /// cursor is left for the first poll on the right network to set.
    pub async fn watch_from_latest(&self) -> GatewayResult<()> {
        let Ok(target) = self.guard.target() else {
            return Ok(());
        };

        let chain_id = self.wallet.chain_id().await.map_err(GatewayError::Events)?;
        if chain_id != target.chain_id {
            tracing::debug!(
                expected = %target.chain_id,
                actual = %chain_id,
                "Not watching events on foreign network"
            );
            return Ok(());
        }

        let latest = self.wallet.block_number().await.map_err(GatewayError::Events)?;
        *lock(&self.cursor) = Some(EventCursor {
            chain_id,
            block: latest,
        });
        tracing::debug!(block = latest, "Watching proposal events");
        Ok(())
    }

    /// Fetch new `ProposalCreated` logs and dispatch them to listeners
    ///
    /// Runs without the chain guard so a background timer never prompts a
    /// network switch: when the wallet is elsewhere the poll is skipped.
    /// Returns the number of events dispatched.
    pub async fn poll_events(&self) -> GatewayResult<usize> {
        let Ok(target) = self.guard.target() else {
            return Ok(0);
        };

        let chain_id = self.wallet.chain_id().await.map_err(GatewayError::Events)?;
        if chain_id != target.chain_id {
            tracing::debug!(
                expected = %target.chain_id,
                actual = %chain_id,
                "Skipping event poll on foreign network"
            );
            return Ok(0);
        }

        let latest = self.wallet.block_number().await.map_err(GatewayError::Events)?;
        let cursor = *lock(&self.cursor);
        let from_block = match cursor {
            Some(cursor) if cursor.chain_id == chain_id => cursor.block + 1,
            _ => {
                *lock(&self.cursor) = Some(EventCursor {
                    chain_id,
                    block: latest,
                });
                return Ok(0);
            }
        };
        if from_block > latest {
            return Ok(0);
        }

        let filter = LogFilter {
            address: target.address,
            topic0: abi::proposal_created_topic(),
            from_block,
            to_block: latest,
        };
        let logs = self.wallet.get_logs(&filter).await.map_err(GatewayError::Events)?;
        *lock(&self.cursor) = Some(EventCursor {
            chain_id,
            block: latest,
        });

        let mut dispatched = 0;
        for log in &logs {
            match abi::decode_proposal_created(log) {
                Ok(event) => {
                    tracing::info!(
                        proposal_id = event.id,
                        author = %event.author,
                        "ProposalCreated"
                    );
                    self.hub.publish(&event);
                    dispatched += 1;
                }
                Err(e) => {
                    tracing::warn!(block = log.block_number, error = %e, "Skipping malformed log");
                }
            }
        }
        Ok(dispatched)
    }
}
