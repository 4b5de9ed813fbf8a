//! Proposal Event Hub
//!
//! Fan-out of decoded `ProposalCreated` events to scoped listeners.
//! Each [`Subscription`] owns an unbounded channel; dropping it removes the
//! listener from the hub exactly once, so a view that re-runs its mount
//! logic can never accumulate duplicate handlers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;

use crate::chain::ProposalCreated;

/// Unique identifier for a listener
pub type ListenerId = u64;

/// Registry of live creation-event listeners
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

#[derive(Default)]
struct HubInner {
    /// Active listeners: ListenerId → channel sender
    listeners: Mutex<HashMap<ListenerId, mpsc::UnboundedSender<ProposalCreated>>>,
    next_id: AtomicU64,
    /// Number of listeners removed so far
    released: AtomicU64,
}

impl HubInner {
    fn listeners(&self) -> MutexGuard<'_, HashMap<ListenerId, mpsc::UnboundedSender<ProposalCreated>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: ListenerId) -> bool {
        let removed = self.listeners().remove(&id).is_some();
        if removed {
            self.released.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(listener_id = id, "Event listener released");
        }
        removed
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new listener
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.listeners().insert(id, sender);

        tracing::debug!(listener_id = id, "Event listener registered");
        Subscription {
            id,
            receiver,
            hub: Arc::downgrade(&self.inner),
            released: false,
        }
    }

    /// Deliver an event to every live listener
    ///
    /// Returns how many listeners received it. Listeners whose receiving
    /// side is gone are pruned.
    pub fn publish(&self, event: &ProposalCreated) -> usize {
        let mut listeners = self.inner.listeners();
        let mut closed = Vec::new();
        let mut delivered = 0;

        for (id, sender) in listeners.iter() {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                closed.push(*id);
            }
        }

        for id in closed {
            listeners.remove(&id);
        }

        tracing::trace!(proposal_id = event.id, delivered, "Published ProposalCreated");
        delivered
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.inner.listeners().len()
    }

    /// Number of listeners removed by their subscriptions so far
    pub fn released_count(&self) -> u64 {
        self.inner.released.load(Ordering::Relaxed)
    }
}

/// Scoped registration with an [`EventHub`]
///
/// Released on [`unsubscribe`](Subscription::unsubscribe) or drop,
/// whichever comes first.
pub struct Subscription {
    id: ListenerId,
    receiver: mpsc::UnboundedReceiver<ProposalCreated>,
    hub: Weak<HubInner>,
    released: bool,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Next pending event, if any
    pub fn try_next(&mut self) -> Option<ProposalCreated> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next event; `None` once the hub is gone
    pub async fn next(&mut self) -> Option<ProposalCreated> {
        self.receiver.recv().await
    }

    /// All pending events
    pub fn drain(&mut self) -> Vec<ProposalCreated> {
        let mut events = Vec::new();
        while let Some(event) = self.try_next() {
            events.push(event);
        }
        events
    }

    /// Release the listener now
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.receiver.close();
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Address;

    fn event(id: u64) -> ProposalCreated {
        ProposalCreated {
            id,
            author: Address::new([0x11; 20]),
            title: format!("Proposal {}", id),
            block_number: id,
        }
    }

    #[test]
    fn test_publish_reaches_all_listeners() {
        let hub = EventHub::new();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        assert_ne!(a.id(), b.id());

        assert_eq!(hub.publish(&event(1)), 2);
        assert_eq!(a.drain(), vec![event(1)]);
        assert_eq!(b.try_next(), Some(event(1)));
        assert_eq!(b.try_next(), None);
    }

    #[test]
    fn test_released_listener_receives_nothing() {
        let hub = EventHub::new();
        let mut kept = hub.subscribe();
        let dropped = hub.subscribe();

        dropped.unsubscribe();
        assert_eq!(hub.listener_count(), 1);
        assert_eq!(hub.publish(&event(7)), 1);
        assert_eq!(kept.drain(), vec![event(7)]);
    }

    #[test]
    fn test_release_happens_once() {
        let hub = EventHub::new();
        {
            let sub = hub.subscribe();
            sub.unsubscribe();
        }
        {
            let _sub = hub.subscribe();
        }
        assert_eq!(hub.listener_count(), 0);
        assert_eq!(hub.released_count(), 2);
    }

    #[test]
    fn test_subscription_outlives_hub() {
        let hub = EventHub::new();
        let mut sub = hub.subscribe();
        hub.publish(&event(3));
        drop(hub);

        assert_eq!(sub.try_next(), Some(event(3)));
        sub.unsubscribe();
    }

    #[tokio::test]
    async fn test_next_waits_for_event() {
        let hub = EventHub::new();
        let mut sub = hub.subscribe();
        let publisher = hub.clone();

        tokio::spawn(async move {
            publisher.publish(&event(9));
        });

        assert_eq!(sub.next().await, Some(event(9)));
    }
}
