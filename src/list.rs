//! Proposal List View
//!
//! Holds no business state of its own: the displayed list is always the
//! result of the most recent successful fetch. Fetches happen on mount,
//! on rebind (reconnect), on creation events and on explicit refresh.

use chrono::Local;
use serde::Serialize;

use crate::chain::Proposal;
use crate::gateway::{ContractGateway, GatewayResult, Subscription};
use crate::wallet::WalletProvider;

/// Text shown when the registry holds no proposals
pub const EMPTY_LIST_TEXT: &str = "No proposals yet.";

/// One rendered proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProposalCard {
    pub id: u64,
    pub title: String,
    pub description: String,
    /// `by 0x1234…abcd · 2024-05-01 14:03`
    pub byline: String,
}

impl ProposalCard {
    pub fn from_proposal(proposal: &Proposal) -> Self {
        let when = proposal
            .created_at_utc()
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| proposal.created_at.to_string());

        Self {
            id: proposal.id,
            title: proposal.title.clone(),
            description: proposal.description.clone(),
            byline: format!("by {} · {}", proposal.author.short(), when),
        }
    }
}

#[derive(Debug, Default)]
pub struct ProposalListView {
    proposals: Vec<Proposal>,
    subscription: Option<Subscription>,
    loaded: bool,
}

impl ProposalListView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to creation events (once) and fetch
    pub async fn mount<W: WalletProvider>(
        &mut self,
        gateway: &ContractGateway<W>,
    ) -> GatewayResult<usize> {
        if self.subscription.is_none() {
            self.subscription = Some(gateway.subscribe());
        }
        self.refresh(gateway).await
    }

    /// Replace the list with a fresh fetch; the old list is kept on error
    pub async fn refresh<W: WalletProvider>(
        &mut self,
        gateway: &ContractGateway<W>,
    ) -> GatewayResult<usize> {
        let proposals = gateway.list_proposals().await?;
        self.proposals = proposals;
        self.loaded = true;
        Ok(self.proposals.len())
    }

    /// Re-fetch if any creation event arrived since the last call
    ///
    /// Returns whether a fetch happened.
    pub async fn handle_events<W: WalletProvider>(
        &mut self,
        gateway: &ContractGateway<W>,
    ) -> GatewayResult<bool> {
        let pending = match self.subscription.as_mut() {
            Some(subscription) => subscription.drain(),
            None => return Ok(false),
        };
        if pending.is_empty() {
            return Ok(false);
        }

        tracing::debug!(events = pending.len(), "Refreshing proposals after events");
        self.refresh(gateway).await?;
        Ok(true)
    }

    /// Move to a new gateway: release the old subscription, then mount
    pub async fn rebind<W: WalletProvider>(
        &mut self,
        gateway: &ContractGateway<W>,
    ) -> GatewayResult<usize> {
        self.teardown();
        self.mount(gateway).await
    }

    /// Release the event subscription
    pub fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    /// Whether at least one fetch succeeded
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    pub fn cards(&self) -> Vec<ProposalCard> {
        self.proposals.iter().map(ProposalCard::from_proposal).collect()
    }

    /// Placeholder text when there is nothing to show
    pub fn empty_text(&self) -> Option<&'static str> {
        self.proposals.is_empty().then_some(EMPTY_LIST_TEXT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Address, ChainId};
    use crate::config::ContractTarget;
    use crate::gateway::GatewaySettings;
    use crate::wallet::MemoryWallet;
    use std::sync::Arc;

    fn registry() -> Address {
        Address::new([0x22; 20])
    }

    fn gateway(wallet: &Arc<MemoryWallet>) -> ContractGateway<MemoryWallet> {
        let target = ContractTarget {
            address: registry(),
            chain_id: ChainId::SEPOLIA,
        };
        ContractGateway::new(wallet.clone(), Ok(target), GatewaySettings::default())
    }

    fn deployed() -> Arc<MemoryWallet> {
        let wallet = Arc::new(MemoryWallet::new(ChainId::SEPOLIA));
        wallet.deploy_registry(registry());
        wallet
    }

    #[tokio::test]
    async fn test_mount_subscribes_once() {
        let wallet = deployed();
        let gateway = gateway(&wallet);
        let mut view = ProposalListView::new();

        view.mount(&gateway).await.unwrap();
        view.mount(&gateway).await.unwrap();
        assert_eq!(gateway.listener_count(), 1);
        assert!(view.is_mounted());

        view.teardown();
        view.teardown();
        assert_eq!(gateway.listener_count(), 0);
        assert_eq!(gateway.hub().released_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_state() {
        let wallet = deployed();
        let gateway = gateway(&wallet);
        let mut view = ProposalListView::new();

        assert_eq!(view.mount(&gateway).await.unwrap(), 0);
        assert!(view.is_loaded());
        assert_eq!(view.empty_text(), Some("No proposals yet."));
    }

    #[tokio::test]
    async fn test_refetch_on_event() {
        let wallet = deployed();
        let gateway = gateway(&wallet);
        let mut view = ProposalListView::new();
        view.mount(&gateway).await.unwrap();
        gateway.watch_from_latest().await.unwrap();

        wallet.seed_proposal(registry(), Address::new([0x33; 20]), "Treasury", "Move funds");
        assert!(!view.handle_events(&gateway).await.unwrap());

        gateway.poll_events().await.unwrap();
        assert!(view.handle_events(&gateway).await.unwrap());
        assert_eq!(view.proposals().len(), 1);
        assert_eq!(view.empty_text(), None);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_list() {
        let wallet = deployed();
        let gateway = gateway(&wallet);
        wallet.seed_proposal(registry(), Address::new([0x33; 20]), "Kept", "k");

        let mut view = ProposalListView::new();
        view.mount(&gateway).await.unwrap();

        wallet.switch_network(ChainId::MAINNET);
        wallet.set_decline_switch(true);
        assert!(view.refresh(&gateway).await.is_err());
        assert_eq!(view.proposals()[0].title, "Kept");
    }

    #[tokio::test]
    async fn test_rebind_moves_subscription() {
        let wallet = deployed();
        let old = gateway(&wallet);
        let new = gateway(&wallet);
        let mut view = ProposalListView::new();

        view.mount(&old).await.unwrap();
        view.rebind(&new).await.unwrap();
        assert_eq!(old.listener_count(), 0);
        assert_eq!(new.listener_count(), 1);
    }

    #[test]
    fn test_card_byline() {
        let proposal = Proposal {
            id: 1,
            author: "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".parse().unwrap(),
            title: "T".into(),
            description: "D".into(),
            created_at: 1_700_000_012,
        };
        let card = ProposalCard::from_proposal(&proposal);
        assert!(card.byline.starts_with("by 0x5aAe…eAed · "));
        assert!(card.byline.contains("2023-11-1"));
    }
}
