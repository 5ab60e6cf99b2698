//! Change notification fan-out.

use crate::model::Mention;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Callback invoked with the changed mention and the affected document path.
pub type ChangeCallback = Arc<dyn Fn(&Mention, &str) + Send + Sync>;

/// Handle returned by [`ChangeDispatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Holds observers and calls them synchronously, in subscription order.
#[derive(Default)]
pub struct ChangeDispatcher {
    subscribers: RwLock<Vec<(SubscriptionId, ChangeCallback)>>,
}

impl ChangeDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Mention, &str) + Send + Sync + 'static,
    {
        let id = SubscriptionId(Uuid::new_v4());
        self.subscribers.write().push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Remove every callback.
    pub fn clear(&self) {
        self.subscribers.write().clear();
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    /// Invoke every callback with `(mention, path)`.
    ///
    /// The subscriber list is copied first, so callbacks may subscribe or
    /// unsubscribe without deadlocking.
    pub fn notify(&self, mention: &Mention, path: &str) {
        let subscribers: Vec<ChangeCallback> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();

        for callback in subscribers {
            callback(mention, path);
        }
    }
}
