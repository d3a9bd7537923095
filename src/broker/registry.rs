//! Topic registry
//!
//! The registry owns the mapping from topic name to `Topic` and is the only
//! way to change a subscriber set. One `Registry` is created per broker and
//! handed to every session as an `Arc<Registry>`.
//!
//! Locking notes:
//! - The map lock is held only for a lookup or an insert.
//! - Each topic has its own lock for its subscriber set; the order is always
//!   map then topic.
//! - No lock is held while talking to a peer. `broadcast` snapshots the
//!   subscriber handles, releases the topic lock, and enqueues into each
//!   subscriber's bounded outbox with `try_send`.
//!
//! Topics are never removed, even once they have no subscribers left.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, warn};

use crate::broker::message::{Framing, Message};
use crate::broker::topic::Topic;
use crate::client::{ConnectionId, Delivery, Subscriber};

#[derive(Debug, Default)]
pub struct Registry {
    topics: Mutex<HashMap<String, Arc<Topic>>>,
    framing: Framing,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_framing(framing: Framing) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            framing,
        }
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Return the topic named `name`, creating it if needed.
    ///
    /// Concurrent callers with the same name always get the same instance.
    pub fn find_or_create(&self, name: &str) -> Arc<Topic> {
        let mut topics = self.lock();
        if let Some(topic) = topics.get(name) {
            return Arc::clone(topic);
        }
        debug!("Created topic '{name}'");
        let topic = Arc::new(Topic::new(name));
        topics.insert(name.to_string(), Arc::clone(&topic));
        topic
    }

    pub fn find(&self, name: &str) -> Option<Arc<Topic>> {
        self.lock().get(name).cloned()
    }

    /// Subscribe to a topic, creating it if it doesn't exist.
    ///
    /// Returns false if the connection was already subscribed.
    pub fn subscribe(&self, topic: &str, subscriber: Subscriber) -> bool {
        self.find_or_create(topic).subscribe(subscriber)
    }

    /// Remove a connection from every topic. Returns how many memberships
    /// were removed; zero for a connection that never subscribed.
    pub fn unsubscribe_all(&self, id: &ConnectionId) -> usize {
        self.all_topics()
            .iter()
            .filter(|topic| topic.unsubscribe(id))
            .count()
    }

    /// Deliver `payload` to every current subscriber of `topic`.
    ///
    /// Subscribers whose outbox is closed are evicted. An unknown topic is a
    /// silent drop. Returns the number of subscribers the line was queued for.
    pub fn broadcast(&self, topic: &str, payload: &str) -> usize {
        self.publish(&Message::new(topic, payload))
    }

    pub fn publish(&self, msg: &Message) -> usize {
        let Some(topic) = self.find(&msg.topic) else {
            debug!("Topic '{}' not found, dropping message", msg.topic);
            return 0;
        };

        let line: Arc<str> = match self.framing.render(msg) {
            Ok(line) => Arc::from(line),
            Err(e) => {
                error!("Failed to render message for '{}': {e}", msg.topic);
                return 0;
            }
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for subscriber in topic.snapshot() {
            match subscriber.deliver(&line) {
                Delivery::Queued => delivered += 1,
                Delivery::Dropped => {
                    warn!(
                        "Outbox full for {}, dropping message on '{}'",
                        subscriber.id, msg.topic
                    );
                }
                Delivery::Closed => closed.push(subscriber.id),
            }
        }

        if !closed.is_empty() {
            let evicted = topic.evict(&closed);
            debug!("Evicted {evicted} subscriber(s) from '{}'", msg.topic);
        }

        delivered
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.find(topic).map_or(0, |t| t.subscriber_count())
    }

    pub fn topic_count(&self) -> usize {
        self.lock().len()
    }

    /// Names of the topics `id` is subscribed to, sorted.
    pub fn topics_of(&self, id: &ConnectionId) -> Vec<String> {
        let mut names: Vec<String> = self
            .all_topics()
            .iter()
            .filter(|topic| topic.contains(id))
            .map(|topic| topic.name().to_string())
            .collect();
        names.sort();
        names
    }

    fn all_topics(&self) -> Vec<Arc<Topic>> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Topic>>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
