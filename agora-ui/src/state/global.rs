//! Global Application State
//!
//! Reactive state management using Leptos signals. Chain access goes
//! through one shared [`ContractGateway`] bound to the injected wallet.

use agora::config::{Config, ConfigError, ContractTarget};
use agora::wallet::WalletError;
use agora::{
    Address, AppError, AppResult, ContractGateway, GatewaySettings, Proposal, Severity,
    StatusMessage, Surface, WalletConnector,
};
use leptos::*;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use crate::wallet::Eip1193Wallet;

pub type Gateway = ContractGateway<Eip1193Wallet>;

/// Orders overlapping proposal fetches so only the newest one lands
#[derive(Clone, Default)]
pub struct FetchGeneration(Rc<Cell<u64>>);

impl FetchGeneration {
    /// Start a fetch, superseding every earlier one
    pub fn begin(&self) -> u64 {
        let next = self.0.get().wrapping_add(1);
        self.0.set(next);
        next
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.0.get() == generation
    }
}

/// Global application state provided to all components
#[derive(Clone)]
pub struct GlobalState {
    /// Account access through the injected provider
    pub connector: WalletConnector<Eip1193Wallet>,
    /// Registry gateway, absent without a wallet
    pub gateway: Option<Rc<Gateway>>,
    /// Configured registry, validated at startup
    pub target: Result<ContractTarget, ConfigError>,
    /// Connected account (never cleared)
    pub account: RwSignal<Option<Address>>,
    /// Result of the most recent successful fetch
    pub proposals: RwSignal<Vec<Proposal>>,
    /// Current status banner
    pub status: RwSignal<Option<StatusMessage>>,
    /// A proposal fetch is running
    pub loading: RwSignal<bool>,
    /// Bumped when the signer changes so views re-fetch
    pub gateway_epoch: RwSignal<u64>,
    /// Latest proposal fetch started
    pub fetches: FetchGeneration,
}

/// Configuration baked in at build time
///
/// `AGORA_CONTRACT_ADDRESS` and `AGORA_CHAIN_ID` are read from the build
/// environment; everything else keeps its default.
pub fn build_config() -> Config {
    let mut config = Config::default();
    config.apply_overrides(|key| {
        match key {
            "AGORA_CONTRACT_ADDRESS" => option_env!("AGORA_CONTRACT_ADDRESS"),
            "AGORA_CHAIN_ID" => option_env!("AGORA_CHAIN_ID"),
            _ => None,
        }
        .map(str::to_string)
    });
    config
}

/// Provide global state to the component tree
pub fn provide_global_state() {
    let config = build_config();
    let target = config.contract.target();
    let wallet = Eip1193Wallet::detect().map(Arc::new);

    if wallet.is_none() {
        web_sys::console::warn_1(&"No injected wallet provider found".into());
    }

    let gateway = wallet.clone().map(|w| {
        Rc::new(ContractGateway::new(
            w,
            target.clone(),
            GatewaySettings::from(&config.rpc),
        ))
    });

    let state = GlobalState {
        connector: WalletConnector::new(wallet),
        gateway,
        target,
        account: create_rw_signal(None),
        proposals: create_rw_signal(Vec::new()),
        status: create_rw_signal(None),
        loading: create_rw_signal(false),
        gateway_epoch: create_rw_signal(0),
        fetches: FetchGeneration::default(),
    };

    provide_context(state);
}

impl GlobalState {
    pub fn is_configured(&self) -> bool {
        self.target.is_ok()
    }

    /// Config check first, then wallet presence
    pub fn ready_gateway(&self) -> AppResult<Rc<Gateway>> {
        if let Err(e) = &self.target {
            return Err(e.clone().into());
        }
        self.gateway
            .clone()
            .ok_or_else(|| WalletError::ProviderNotFound.into())
    }

    /// Show an error on the given surface
    pub fn report(&self, err: &AppError, surface: Surface) {
        let text = err.to_string();
        web_sys::console::warn_1(&format!("{:?}: {}", err.kind(), text).into());

        if surface == Surface::Alert {
            if let Some(window) = web_sys::window() {
                let _ = window.alert_with_message(&text);
            }
        }
        self.status.set(Some(StatusMessage {
            severity: surface.severity(),
            text,
        }));
    }

    pub fn show_warning(&self, text: impl Into<String>) {
        self.status.set(Some(StatusMessage {
            severity: Severity::Warning,
            text: text.into(),
        }));
    }

    /// Show an info message (auto-clears after timeout)
    pub fn show_info(&self, text: impl Into<String>) {
        let message = StatusMessage {
            severity: Severity::Info,
            text: text.into(),
        };
        self.status.set(Some(message.clone()));

        let status = self.status;
        gloo_timers::callback::Timeout::new(3000, move || {
            // Leave newer messages alone
            if status.get_untracked().as_ref() == Some(&message) {
                status.set(None);
            }
        })
        .forget();
    }

    pub fn clear_status(&self) {
        self.status.set(None);
    }

    /// Request account access
    pub async fn connect(&self) {
        match self.connector.connect().await {
            Ok(Some(account)) => {
                self.account.set(Some(account));
                if let Some(gateway) = &self.gateway {
                    gateway.set_signer(Some(account));
                }
                self.gateway_epoch.update(|epoch| *epoch += 1);
                self.show_info(format!("Connected {}", account.short()));
            }
            // Rejected prompt: nothing changes
            Ok(None) => {}
            Err(e) => {
                let err = AppError::from(e);
                self.report(&err, err.surface());
            }
        }
    }

    /// Replace the proposal list with a fresh fetch
    ///
    /// The previous list stays on screen when the fetch fails. Results of
    /// a fetch overtaken by a newer one are dropped.
    pub async fn refresh(&self) {
        let gateway = match self.ready_gateway() {
            Ok(gateway) => gateway,
            Err(err) => {
                self.report(&err, err.surface());
                return;
            }
        };

        let generation = self.fetches.begin();
        self.loading.set(true);
        let result = gateway.list_proposals().await;
        if !self.fetches.is_current(generation) {
            return;
        }

        match result {
            Ok(proposals) => {
                self.proposals.set(proposals);
                if self
                    .status
                    .get_untracked()
                    .map_or(false, |s| s.severity == Severity::Warning)
                {
                    self.clear_status();
                }
            }
            Err(e) => {
                let err = AppError::from(e);
                self.report(&err, err.surface());
            }
        }
        self.loading.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn test_only_latest_fetch_is_current() {
        let fetches = FetchGeneration::default();
        let older = fetches.begin();
        let newer = fetches.clone().begin();
        assert!(!fetches.is_current(older));
        assert!(fetches.is_current(newer));
    }

    #[wasm_bindgen_test]
    fn test_build_config_defaults_to_sepolia() {
        let config = build_config();
        if option_env!("AGORA_CHAIN_ID").is_none() {
            assert_eq!(config.contract.chain_id, 11_155_111);
        }
    }
}
