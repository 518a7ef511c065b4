use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use super::Identity;

/// An auth-state notification: `Some` when a user is signed in, `None` otherwise.
pub type AuthChange = Option<Identity>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<u64, mpsc::UnboundedSender<AuthChange>>,
    /// `None` until the provider has resolved its initial state
    current: Option<AuthChange>,
}

/// Observable source of auth-state changes.
///
/// Cloning shares the same listener registry. Each subscriber gets its own
/// channel; dropping the [`AuthSubscription`] removes it from the registry.
#[derive(Clone, Default)]
pub struct AuthEvents {
    registry: Arc<Mutex<Registry>>,
}

impl AuthEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. If the state is already resolved it is queued
    /// for the new listener right away.
    pub fn subscribe(&self) -> AuthSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = self.registry.lock();

        if let Some(current) = registry.current.clone() {
            let _ = tx.send(current);
        }

        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.insert(id, tx);
        debug!(listener = id, total = registry.listeners.len(), "auth listener subscribed");

        AuthSubscription {
            id,
            registry: Arc::clone(&self.registry),
            receiver: rx,
        }
    }

    /// Record the new state and deliver it to every listener.
    pub fn publish(&self, change: AuthChange) {
        let mut registry = self.registry.lock();
        registry.current = Some(change.clone());
        registry
            .listeners
            .retain(|_, tx| tx.send(change.clone()).is_ok());
        debug!(
            signed_in = change.is_some(),
            listeners = registry.listeners.len(),
            "published auth state"
        );
    }

    /// Number of live listeners
    pub fn listener_count(&self) -> usize {
        self.registry.lock().listeners.len()
    }

    /// The last published state, or `None` if nothing was published yet
    pub fn current(&self) -> Option<AuthChange> {
        self.registry.lock().current.clone()
    }
}

/// A live auth-state listener. Unsubscribes on drop.
pub struct AuthSubscription {
    id: u64,
    registry: Arc<Mutex<Registry>>,
    receiver: mpsc::UnboundedReceiver<AuthChange>,
}

impl AuthSubscription {
    /// Wait for the next notification.
    ///
    /// Returns `None` once the listener is no longer registered and the
    /// queue is drained.
    pub async fn next(&mut self) -> Option<AuthChange> {
        self.receiver.recv().await
    }

    /// Take a queued notification without waiting.
    pub fn try_next(&mut self) -> Option<AuthChange> {
        self.receiver.try_recv().ok()
    }

    pub fn unsubscribe(self) {}
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        let mut registry = self.registry.lock();
        registry.listeners.remove(&self.id);
        debug!(listener = self.id, total = registry.listeners.len(), "auth listener unsubscribed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            uid: "u1".to_string(),
            email: Some("a@b.co".to_string()),
            display_name: None,
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_changes() {
        let events = AuthEvents::new();
        let mut sub = events.subscribe();
        assert!(sub.try_next().is_none());

        events.publish(Some(identity()));
        events.publish(None);

        assert_eq!(sub.next().await, Some(Some(identity())));
        assert_eq!(sub.next().await, Some(None));
    }

    #[tokio::test]
    async fn late_subscriber_gets_current_state() {
        let events = AuthEvents::new();
        events.publish(None);

        let mut sub = events.subscribe();
        assert_eq!(sub.try_next(), Some(None));
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let events = AuthEvents::new();
        let a = events.subscribe();
        let b = events.subscribe();
        assert_eq!(events.listener_count(), 2);

        drop(a);
        assert_eq!(events.listener_count(), 1);
        b.unsubscribe();
        assert_eq!(events.listener_count(), 0);
    }

    #[test]
    fn current_is_unresolved_until_published() {
        let events = AuthEvents::new();
        assert_eq!(events.current(), None);
        events.publish(None);
        assert_eq!(events.current(), Some(None));
    }
}
