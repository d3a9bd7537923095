//! Topic management
//!
//! A `Topic` holds the subscribers of one topic name, keyed by connection
//! identity so a duplicate subscription is a no-op. The subscriber map has
//! its own lock; mutation is only reachable through the `Registry`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::client::{ConnectionId, Subscriber};

#[derive(Debug)]
pub struct Topic {
    name: String,
    subscribers: Mutex<HashMap<ConnectionId, Subscriber>>,
}

impl Topic {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.lock().contains_key(id)
    }

    /// Add a subscriber. Returns false if it was already present.
    pub(crate) fn subscribe(&self, subscriber: Subscriber) -> bool {
        let mut subscribers = self.lock();
        if subscribers.contains_key(&subscriber.id) {
            return false;
        }
        subscribers.insert(subscriber.id, subscriber);
        true
    }

    pub(crate) fn unsubscribe(&self, id: &ConnectionId) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Copy of the current subscriber handles, taken under the lock.
    pub(crate) fn snapshot(&self) -> Vec<Subscriber> {
        self.lock().values().cloned().collect()
    }

    /// Remove the given subscribers if their outbox is still closed.
    pub(crate) fn evict(&self, ids: &[ConnectionId]) -> usize {
        let mut subscribers = self.lock();
        let mut evicted = 0;
        for id in ids {
            if subscribers.get(id).is_some_and(Subscriber::is_closed) {
                subscribers.remove(id);
                evicted += 1;
            }
        }
        evicted
    }

    // A panic while holding the lock cannot leave the map half-updated.
    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Subscriber>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
