//! In-memory wallet and chain
//!
//! Simulates a wallet attached to a development chain that hosts the
//! governance registry. Requests travel the same JSON path as a real
//! provider, so the typed helpers and the ABI codec are exercised end to end.
//! Used by the test-suite and by the CLI's `--simulated` mode.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{WalletError, WalletProvider};
use crate::chain::abi::{self, GET_PROPOSALS_SIGNATURE};
use crate::chain::{
    keccak256, parse_data, parse_quantity, to_data, to_quantity, Address, ChainId, Log, Proposal,
    TxHash,
};

/// Block time of block 0
const GENESIS_TIMESTAMP: u64 = 1_700_000_000;
/// Seconds between simulated blocks
const BLOCK_TIME: u64 = 12;
/// Placeholder runtime bytecode for deployed registries
const REGISTRY_CODE: [u8; 4] = [0x60, 0x80, 0x60, 0x40];

/// Simulated wallet + chain
///
/// Cloning shares the underlying chain.
#[derive(Debug, Clone)]
pub struct MemoryWallet {
    state: Arc<Mutex<ChainState>>,
}

#[derive(Debug)]
struct ChainState {
    chain_id: ChainId,
    /// Networks the wallet is able to switch to
    known_chains: HashSet<ChainId>,
    accounts: Vec<Address>,
    authorized: bool,
    reject_accounts: bool,
    decline_switch: bool,
    fail_next_send: Option<WalletError>,
    revert_next_send: bool,
    /// Receipt polls answered with `null` before a receipt appears
    confirmation_polls: u32,
    registries: HashMap<(ChainId, Address), Vec<Proposal>>,
    logs: Vec<(ChainId, Log)>,
    receipts: HashMap<TxHash, PendingReceipt>,
    /// Head block of every network, absent means genesis
    heights: HashMap<ChainId, u64>,
    nonce: u64,
    requests: Vec<String>,
}

#[derive(Debug)]
struct PendingReceipt {
    block_number: u64,
    success: bool,
    polls_remaining: u32,
}

impl MemoryWallet {
    /// A wallet on `chain_id` holding one account
    pub fn new(chain_id: ChainId) -> Self {
        let state = ChainState {
            chain_id,
            known_chains: HashSet::from([chain_id]),
            accounts: vec![Self::default_account()],
            authorized: false,
            reject_accounts: false,
            decline_switch: false,
            fail_next_send: None,
            revert_next_send: false,
            confirmation_polls: 0,
            registries: HashMap::new(),
            logs: Vec::new(),
            receipts: HashMap::new(),
            heights: HashMap::new(),
            nonce: 0,
            requests: Vec::new(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Account exposed by a fresh wallet
    pub fn default_account() -> Address {
        Address::new([0x11; 20])
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deploy an empty registry at `address` on the active chain
    pub fn deploy_registry(&self, address: Address) -> &Self {
        let mut state = self.state();
        let chain = state.chain_id;
        state.registries.entry((chain, address)).or_default();
        self
    }

    /// Replace the wallet's accounts
    pub fn set_accounts(&self, accounts: Vec<Address>) -> &Self {
        self.state().accounts = accounts;
        self
    }

    /// Make a network available for `wallet_switchEthereumChain`
    pub fn add_known_chain(&self, chain_id: ChainId) -> &Self {
        self.state().known_chains.insert(chain_id);
        self
    }

    /// Reject every `eth_requestAccounts`
    pub fn set_reject_accounts(&self, reject: bool) -> &Self {
        self.state().reject_accounts = reject;
        self
    }

    /// Decline every network switch request
    pub fn set_decline_switch(&self, decline: bool) -> &Self {
        self.state().decline_switch = decline;
        self
    }

    /// Fail the next `eth_sendTransaction` with `error`
    pub fn fail_next_transaction(&self, error: WalletError) -> &Self {
        self.state().fail_next_send = Some(error);
        self
    }

    /// Mine the next transaction with a failed status
    pub fn revert_next_transaction(&self) -> &Self {
        self.state().revert_next_send = true;
        self
    }

    /// Number of `null` receipt answers before a receipt is returned
    pub fn set_confirmation_polls(&self, polls: u32) -> &Self {
        self.state().confirmation_polls = polls;
        self
    }

    /// Switch the active network from outside the client
    pub fn switch_network(&self, chain_id: ChainId) -> &Self {
        let mut state = self.state();
        state.known_chains.insert(chain_id);
        state.chain_id = chain_id;
        self
    }

    /// Move the head of `chain_id` to `height` without mining anything
    pub fn set_block_height(&self, chain_id: ChainId, height: u64) -> &Self {
        self.state().heights.insert(chain_id, height);
        self
    }

    /// Head block of the active network
    pub fn block_height(&self) -> u64 {
        self.state().head()
    }

    /// Append a proposal as if another account had submitted it
    pub fn seed_proposal(&self, registry: Address, author: Address, title: &str, description: &str) {
        let mut state = self.state();
        state.append_proposal(registry, author, title.to_string(), description.to_string());
    }

    /// Proposals stored by the registry at `address` on the active chain
    pub fn proposals(&self, address: Address) -> Vec<Proposal> {
        let state = self.state();
        state
            .registries
            .get(&(state.chain_id, address))
            .cloned()
            .unwrap_or_default()
    }

    /// Every method received so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.state().requests.clone()
    }

    /// How many times `method` was requested
    pub fn request_count(&self, method: &str) -> usize {
        self.state().requests.iter().filter(|m| *m == method).count()
    }

    pub fn clear_requests(&self) {
        self.state().requests.clear();
    }
}

impl ChainState {
    fn head(&self) -> u64 {
        self.heights.get(&self.chain_id).copied().unwrap_or(0)
    }

    fn mine_block(&mut self) -> u64 {
        let head = self.heights.entry(self.chain_id).or_insert(0);
        *head += 1;
        *head
    }

    fn append_proposal(
        &mut self,
        registry: Address,
        author: Address,
        title: String,
        description: String,
    ) -> u64 {
        let block = self.mine_block();
        let chain = self.chain_id;
        let proposals = self.registries.entry((chain, registry)).or_default();

        let id = proposals.len() as u64 + 1;
        let (topics, data) = abi::encode_proposal_created(id, &author, &title);
        proposals.push(Proposal {
            id,
            author,
            title,
            description,
            created_at: GENESIS_TIMESTAMP + block * BLOCK_TIME,
        });
        self.logs.push((
            chain,
            Log {
                address: registry,
                topics,
                data,
                block_number: block,
            },
        ));
        block
    }

    fn dispatch(&mut self, method: &str, params: &Value) -> Result<Value, WalletError> {
        match method {
            "eth_requestAccounts" => {
                if self.reject_accounts {
                    return Err(WalletError::UserRejected);
                }
                self.authorized = true;
                Ok(self.accounts_json())
            }
            "eth_accounts" => {
                if self.authorized {
                    Ok(self.accounts_json())
                } else {
                    Ok(json!([]))
                }
            }
            "eth_chainId" => Ok(json!(self.chain_id.to_quantity())),
            "eth_blockNumber" => Ok(json!(to_quantity(self.head()))),
            "wallet_switchEthereumChain" => self.switch_chain(params),
            "eth_getCode" => {
                let address = address_param(&params[0])?;
                let deployed = self.registries.contains_key(&(self.chain_id, address));
                let code: &[u8] = if deployed { &REGISTRY_CODE } else { &[] };
                Ok(json!(to_data(code)))
            }
            "eth_call" => self.call(&params[0]),
            "eth_sendTransaction" => self.send_transaction(&params[0]),
            "eth_getTransactionReceipt" => self.receipt(&params[0]),
            "eth_getLogs" => self.logs(&params[0]),
            other => Err(WalletError::UnsupportedMethod(other.to_string())),
        }
    }

    fn accounts_json(&self) -> Value {
        Value::Array(
            self.accounts
                .iter()
                .map(|a| Value::String(a.to_lower_hex()))
                .collect(),
        )
    }

    fn switch_chain(&mut self, params: &Value) -> Result<Value, WalletError> {
        let requested = params[0]["chainId"]
            .as_str()
            .ok_or_else(|| invalid_params("chainId"))
            .and_then(|q| ChainId::from_quantity(q).map_err(|_| invalid_params("chainId")))?;

        if self.decline_switch {
            return Err(WalletError::UserRejected);
        }
        if !self.known_chains.contains(&requested) {
            return Err(WalletError::UnrecognizedChain);
        }
        self.chain_id = requested;
        Ok(Value::Null)
    }

    fn call(&self, call: &Value) -> Result<Value, WalletError> {
        let to = address_param(&call["to"])?;
        let data = data_param(&call["data"])?;

        let Some(proposals) = self.registries.get(&(self.chain_id, to)) else {
            // Calls to accounts without code succeed with empty output
            return Ok(json!("0x"));
        };
        if data.as_slice() == abi::selector(GET_PROPOSALS_SIGNATURE).as_slice() {
            Ok(json!(to_data(&abi::encode_proposals(proposals))))
        } else {
            Err(WalletError::Reverted(None))
        }
    }

    fn send_transaction(&mut self, tx: &Value) -> Result<Value, WalletError> {
        let from = address_param(&tx["from"])?;
        let to = address_param(&tx["to"])?;
        let data = data_param(&tx["data"])?;

        if !self.authorized || !self.accounts.contains(&from) {
            return Err(WalletError::Unauthorized(from.to_string()));
        }
        if let Some(error) = self.fail_next_send.take() {
            return Err(error);
        }
        if !self.registries.contains_key(&(self.chain_id, to)) {
            return Err(WalletError::Reverted(None));
        }
        let (title, description) =
            abi::decode_create_proposal(&data).map_err(|_| WalletError::Reverted(None))?;
        if title.is_empty() {
            return Err(WalletError::Reverted(Some("title required".to_string())));
        }

        self.nonce += 1;
        let mut preimage = from.as_bytes().to_vec();
        preimage.extend_from_slice(&self.nonce.to_be_bytes());
        let hash = TxHash(keccak256(&preimage));

        let success = !std::mem::take(&mut self.revert_next_send);
        let block_number = if success {
            self.append_proposal(to, from, title, description)
        } else {
            self.mine_block()
        };
        self.receipts.insert(
            hash,
            PendingReceipt {
                block_number,
                success,
                polls_remaining: self.confirmation_polls,
            },
        );
        Ok(json!(hash.to_string()))
    }

    fn receipt(&mut self, hash: &Value) -> Result<Value, WalletError> {
        let hash: TxHash = hash
            .as_str()
            .and_then(|h| h.parse().ok())
            .ok_or_else(|| invalid_params("transaction hash"))?;

        let Some(pending) = self.receipts.get_mut(&hash) else {
            return Ok(Value::Null);
        };
        if pending.polls_remaining > 0 {
            pending.polls_remaining -= 1;
            return Ok(Value::Null);
        }
        Ok(json!({
            "transactionHash": hash.to_string(),
            "blockNumber": to_quantity(pending.block_number),
            "status": if pending.success { "0x1" } else { "0x0" },
        }))
    }

    fn logs(&self, filter: &Value) -> Result<Value, WalletError> {
        let address = address_param(&filter["address"])?;
        let topic0 = filter["topics"][0].as_str().map(str::to_lowercase);
        let from = quantity_param(&filter["fromBlock"], 0)?;
        let to = quantity_param(&filter["toBlock"], self.head())?;

        let matching: Vec<Value> = self
            .logs
            .iter()
            .filter(|(chain, log)| {
                *chain == self.chain_id
                    && log.address == address
                    && (from..=to).contains(&log.block_number)
                    && topic0
                        .as_deref()
                        .map_or(true, |t| log.topics.first().map(|w| to_data(w)).as_deref() == Some(t))
            })
            .map(|(_, log)| {
                json!({
                    "address": log.address.to_lower_hex(),
                    "topics": log.topics.iter().map(|t| to_data(t)).collect::<Vec<_>>(),
                    "data": to_data(&log.data),
                    "blockNumber": to_quantity(log.block_number),
                })
            })
            .collect();
        Ok(Value::Array(matching))
    }
}

fn invalid_params(what: &str) -> WalletError {
    WalletError::Rpc {
        code: -32602,
        message: format!("invalid {}", what),
    }
}

fn address_param(value: &Value) -> Result<Address, WalletError> {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| invalid_params("address"))
}

fn data_param(value: &Value) -> Result<Vec<u8>, WalletError> {
    match value.as_str() {
        Some(s) => parse_data(s).map_err(|_| invalid_params("data")),
        None => Ok(Vec::new()),
    }
}

fn quantity_param(value: &Value, default: u64) -> Result<u64, WalletError> {
    match value.as_str() {
        None | Some("latest") => Ok(default),
        Some("earliest") => Ok(0),
        Some(q) => parse_quantity(q).map_err(|_| invalid_params("block")),
    }
}

#[async_trait(?Send)]
impl WalletProvider for MemoryWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        let mut state = self.state();
        state.requests.push(method.to_string());
        let result = state.dispatch(method, &params);
        tracing::trace!(method, ok = result.is_ok(), "Simulated wallet request");
        result
    }

    async fn pause(&self, _interval: Duration) {}
}
