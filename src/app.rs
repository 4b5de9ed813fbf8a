//! Governance application shell
//!
//! Composes the connector, gateway, form and list view with the session
//! state. Every operation catches its errors here, logs them and turns
//! them into a status message or an alert.

use std::sync::Arc;

use crate::chain::{Address, Proposal, TransactionReceipt};
use crate::config::{Config, ConfigError, ContractTarget};
use crate::connector::WalletConnector;
use crate::error::{AppError, AppResult, Surface};
use crate::form::ProposalForm;
use crate::gateway::{ContractGateway, GatewaySettings};
use crate::list::{ProposalCard, ProposalListView};
use crate::session::{Session, StatusMessage};
use crate::wallet::{WalletError, WalletProvider};

/// One running governance client
pub struct GovernanceApp<W: WalletProvider> {
    connector: WalletConnector<W>,
    target: Result<ContractTarget, ConfigError>,
    gateway: Option<ContractGateway<W>>,
    session: Session,
    form: ProposalForm,
    list: ProposalListView,
}

/// Config check first, then wallet presence
fn ready_gateway<'a, W: WalletProvider>(
    target: &Result<ContractTarget, ConfigError>,
    gateway: &'a Option<ContractGateway<W>>,
) -> AppResult<&'a ContractGateway<W>> {
    if let Err(e) = target {
        return Err(e.clone().into());
    }
    gateway
        .as_ref()
        .ok_or_else(|| WalletError::ProviderNotFound.into())
}

impl<W: WalletProvider> GovernanceApp<W> {
    pub fn new(config: &Config, wallet: Option<Arc<W>>) -> Self {
        Self::with_target(
            config.contract.target(),
            GatewaySettings::from(&config.rpc),
            wallet,
        )
    }

    pub fn with_target(
        target: Result<ContractTarget, ConfigError>,
        settings: GatewaySettings,
        wallet: Option<Arc<W>>,
    ) -> Self {
        if let Err(e) = &target {
            tracing::warn!(error = %e, "Registry not configured; reads and writes are disabled");
        }
        let gateway = wallet
            .clone()
            .map(|w| ContractGateway::new(w, target.clone(), settings));

        Self {
            connector: WalletConnector::new(wallet),
            target,
            gateway,
            session: Session::new(),
            form: ProposalForm::new(),
            list: ProposalListView::new(),
        }
    }

    fn report(&mut self, err: &AppError, surface: Surface) {
        tracing::warn!(kind = ?err.kind(), error = %err, "Operation failed");
        self.session.set_status(surface.severity(), err.to_string());
    }

    /// Mount the list view and start watching for new proposals
    pub async fn start(&mut self) -> AppResult<usize> {
        let result = match ready_gateway(&self.target, &self.gateway) {
            Ok(gateway) => {
                let mounted = self.list.mount(gateway).await.map_err(AppError::from);
                // The guard has run by now, so the head is read on the target network
                if let Err(e) = gateway.watch_from_latest().await {
                    tracing::warn!(error = %e, "Could not read the latest block");
                }
                mounted
            }
            Err(e) => Err(e),
        };

        self.finish_read(result)
    }

    fn finish_read(&mut self, result: AppResult<usize>) -> AppResult<usize> {
        match result {
            Ok(count) => {
                self.session.clear_status();
                Ok(count)
            }
            Err(err) => {
                self.report(&err, err.surface());
                Err(err)
            }
        }
    }

    /// Request account access
    ///
    /// A rejected prompt leaves the session untouched. On success the list
    /// view is rebound so it re-fetches for the new signer.
    pub async fn connect(&mut self) -> AppResult<Option<Address>> {
        let account = match self.connector.connect().await {
            Ok(Some(account)) => account,
            Ok(None) => return Ok(None),
            Err(e) => {
                let err = AppError::from(e);
                self.report(&err, err.surface());
                return Err(err);
            }
        };

        self.session.set_account(account);
        if let Some(gateway) = &self.gateway {
            gateway.set_signer(Some(account));
            if self.target.is_ok() {
                let result = self.list.rebind(gateway).await.map_err(AppError::from);
                // The list failure is reported but the connection stands
                let _ = self.finish_read(result);
            }
        }
        if self.session.status().is_none() {
            self.session.info(format!("Connected {}", account.short()));
        }
        Ok(Some(account))
    }

    /// Re-fetch the proposal list
    pub async fn refresh(&mut self) -> AppResult<usize> {
        let result = match ready_gateway(&self.target, &self.gateway) {
            Ok(gateway) => self.list.refresh(gateway).await.map_err(AppError::from),
            Err(e) => Err(e),
        };
        self.finish_read(result)
    }

    /// Submit the form's draft and wait for it to be mined
    ///
    /// Returns `Ok(None)` when the form is not submittable; the reason is
    /// shown as a warning. Failures are shown as alerts and keep the draft.
    pub async fn submit(&mut self) -> AppResult<Option<TransactionReceipt>> {
        if let Err(e) = self.form.validate(self.session.account()) {
            self.session.warn(e.to_string());
            return Ok(None);
        }
        let gateway = match ready_gateway(&self.target, &self.gateway) {
            Ok(gateway) => gateway,
            Err(err) => {
                self.report(&err, Surface::Alert);
                return Err(err);
            }
        };

        let ticket = match self.form.begin(self.session.account()) {
            Ok(ticket) => ticket,
            Err(e) => {
                self.session.warn(e.to_string());
                return Ok(None);
            }
        };

        let result = gateway
            .create_proposal(ticket.signer, &ticket.title, &ticket.description)
            .await;
        self.form.settle(ticket, result.is_ok());

        match result {
            Ok(receipt) => {
                if let Err(e) = self.list.refresh(gateway).await {
                    tracing::warn!(error = %e, "Reload after submit failed");
                }
                self.session
                    .info(format!("Proposal submitted in block {}.", receipt.block_number));
                Ok(Some(receipt))
            }
            Err(e) => {
                let err = AppError::from_write(e);
                self.report(&err, Surface::Alert);
                Err(err)
            }
        }
    }

    /// Poll for creation events and re-fetch if any arrived
    ///
    /// Returns the number of events dispatched.
    pub async fn pump_events(&mut self) -> AppResult<usize> {
        let Some(gateway) = &self.gateway else {
            return Ok(0);
        };
        if self.target.is_err() {
            return Ok(0);
        }

        let dispatched = match gateway.poll_events().await {
            Ok(n) => n,
            Err(e) => {
                let err = AppError::from(e);
                self.report(&err, err.surface());
                return Err(err);
            }
        };

        if let Err(e) = self.list.handle_events(gateway).await {
            let err = AppError::from(e);
            self.report(&err, err.surface());
            return Err(err);
        }
        Ok(dispatched)
    }

    /// Release the event subscription
    pub fn shutdown(&mut self) {
        self.list.teardown();
        tracing::debug!("Governance client shut down");
    }

    pub fn is_configured(&self) -> bool {
        self.target.is_ok()
    }

    pub fn has_wallet(&self) -> bool {
        self.connector.is_available()
    }

    pub fn account(&self) -> Option<Address> {
        self.session.account()
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.session.status()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn form(&self) -> &ProposalForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ProposalForm {
        &mut self.form
    }

    /// Submit control enablement
    pub fn can_submit(&self) -> bool {
        self.form.can_submit(self.session.account())
    }

    pub fn list(&self) -> &ProposalListView {
        &self.list
    }

    pub fn proposals(&self) -> &[Proposal] {
        self.list.proposals()
    }

    pub fn cards(&self) -> Vec<ProposalCard> {
        self.list.cards()
    }

    pub fn gateway(&self) -> Option<&ContractGateway<W>> {
        self.gateway.as_ref()
    }
}
