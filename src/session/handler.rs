//! Session handler
//!
//! One `Session` per connection. The first line decides the role:
//! - a subscriber is added to the registry, then its lines are read only to
//!   pick up further `SUBSCRIBE` commands. A writer task drains its outbox to
//!   the connection's sink, and the session ends as soon as that writer does.
//!   Subscribers are silent by protocol, so the idle timeout does not apply.
//! - a publisher is bound to one topic and every `MESSAGE` line is broadcast
//!   to that topic.
//!
//! Subscriber cleanup is tied to a guard, so it also happens if the session
//! task panics or is cancelled.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::broker::Registry;
use crate::client::{Connection, ConnectionId, LineSink, LineSource, Subscriber};
use crate::config::BrokerSettings;
use crate::session::command::{Role, RoleLine, parse_message, parse_role_line, parse_subscribe};
use crate::utils::{ConnectionError, ProtocolError};

/// Reply sent to a publisher for a line that is not `MESSAGE <text>`.
pub const PUBLISHER_WARNING: &str = "WARN: use 'MESSAGE <text>'";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_topic_bytes: usize,
    pub outbound_queue: usize,
    pub idle_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&BrokerSettings::default())
    }
}

impl From<&BrokerSettings> for SessionConfig {
    fn from(settings: &BrokerSettings) -> Self {
        Self {
            max_topic_bytes: settings.max_topic_bytes,
            outbound_queue: settings.outbound_queue,
            idle_timeout: settings.idle_timeout(),
        }
    }
}

/// Why a session reached `Closed`.
#[derive(Debug)]
pub enum SessionEnd {
    /// The peer went away. Normal termination for either role.
    Disconnected,
    /// The first line did not classify the peer.
    Rejected(ProtocolError),
    /// Nothing was received within the idle timeout.
    IdleTimeout,
    /// A publisher could not be sent its warning reply.
    ReplyFailed,
    /// Writing a delivery to a subscriber failed.
    DeliveryFailed,
    /// Reading from the peer failed.
    Failed(ConnectionError),
}

impl From<ConnectionError> for SessionEnd {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::Closed => SessionEnd::Disconnected,
            ConnectionError::IdleTimeout => SessionEnd::IdleTimeout,
            other => SessionEnd::Failed(other),
        }
    }
}

pub struct Session {
    conn: Connection,
    registry: Arc<Registry>,
    config: SessionConfig,
}

impl Session {
    pub fn new(conn: Connection, registry: Arc<Registry>, config: SessionConfig) -> Self {
        Self {
            conn,
            registry,
            config,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.conn.id
    }

    pub async fn run(self) -> SessionEnd {
        let Session {
            conn,
            registry,
            config,
        } = self;
        let Connection {
            id,
            peer,
            mut source,
            mut sink,
        } = conn;
        let ctx = Context {
            id,
            peer,
            registry,
            config,
        };

        let first = match ctx.next_line(source.as_mut()).await {
            Ok(Some(line)) => line,
            Ok(None) => {
                sink.close().await;
                return SessionEnd::Disconnected;
            }
            Err(e) => {
                sink.close().await;
                return e.into();
            }
        };

        match parse_role_line(&first, ctx.config.max_topic_bytes) {
            Ok(RoleLine {
                role: Role::Subscribe,
                topic,
            }) => ctx.subscriber_loop(topic, source, sink).await,
            Ok(RoleLine {
                role: Role::Publish,
                topic,
            }) => ctx.publisher_loop(topic, source, sink).await,
            Err(err) => {
                warn!("{} ({}) sent an invalid first line: {err:?}", ctx.id, ctx.peer);
                if let Err(e) = sink.send(&err.to_string()).await {
                    debug!("Failed to send protocol error to {}: {e}", ctx.id);
                }
                sink.close().await;
                SessionEnd::Rejected(err)
            }
        }
    }
}

struct Context {
    id: ConnectionId,
    peer: String,
    registry: Arc<Registry>,
    config: SessionConfig,
}

impl Context {
    async fn next_line(
        &self,
        source: &mut dyn LineSource,
    ) -> Result<Option<String>, ConnectionError> {
        match self.config.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, source.receive_line())
                .await
                .map_err(|_| ConnectionError::IdleTimeout)?,
            None => source.receive_line().await,
        }
    }

    async fn subscriber_loop(
        &self,
        topic: String,
        mut source: Box<dyn LineSource>,
        mut sink: Box<dyn LineSink>,
    ) -> SessionEnd {
        let (subscriber, mut outbox) = Subscriber::channel(self.id, self.config.outbound_queue);
        let guard = SubscriptionGuard {
            registry: Arc::clone(&self.registry),
            id: self.id,
        };

        let mut writer = {
            let id = self.id;
            tokio::spawn(async move {
                while let Some(line) = outbox.recv().await {
                    if let Err(e) = sink.send(&line).await {
                        debug!("Failed to send message to {id}: {e}");
                        break;
                    }
                }
                sink.close().await;
                debug!("Send loop closed for {id}");
            })
        };

        let mut topics = HashSet::new();
        self.join(&subscriber, &topic, &mut topics);

        // the outbox sender lives as long as `subscriber`, so the writer only
        // finishes on its own after a failed send
        let end = loop {
            tokio::select! {
                _ = &mut writer => break SessionEnd::DeliveryFailed,
                line = source.receive_line() => match line {
                    Ok(Some(line)) => match parse_subscribe(&line, self.config.max_topic_bytes) {
                        Some(next) => self.join(&subscriber, next, &mut topics),
                        None => debug!("Ignoring line from subscriber {}", self.id),
                    },
                    Ok(None) => break SessionEnd::Disconnected,
                    Err(e) => break e.into(),
                },
            }
        };

        drop(subscriber);
        drop(guard);
        writer.abort();
        info!("{} disconnected after subscribing to {} topic(s)", self.id, topics.len());
        end
    }

    fn join(&self, subscriber: &Subscriber, topic: &str, topics: &mut HashSet<String>) {
        if self.registry.subscribe(topic, subscriber.clone()) {
            info!("{} subscribed to '{topic}'", self.id);
        }
        topics.insert(topic.to_string());
    }

    async fn publisher_loop(
        &self,
        topic: String,
        mut source: Box<dyn LineSource>,
        mut sink: Box<dyn LineSink>,
    ) -> SessionEnd {
        self.registry.find_or_create(&topic);
        info!("{} ({}) publishing to '{topic}'", self.id, self.peer);

        let end = loop {
            match self.next_line(source.as_mut()).await {
                Ok(Some(line)) => match parse_message(&line) {
                    Some(payload) => {
                        let delivered = self.registry.broadcast(&topic, payload);
                        debug!("{} published to '{topic}' ({delivered} subscriber(s))", self.id);
                    }
                    None => {
                        if let Err(e) = sink.send(PUBLISHER_WARNING).await {
                            debug!("Failed to warn publisher {}: {e}", self.id);
                            break SessionEnd::ReplyFailed;
                        }
                    }
                },
                Ok(None) => break SessionEnd::Disconnected,
                Err(e) => break e.into(),
            }
        };

        sink.close().await;
        info!("{} disconnected", self.id);
        end
    }
}

/// Removes the connection from every topic when dropped.
struct SubscriptionGuard {
    registry: Arc<Registry>,
    id: ConnectionId,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let removed = self.registry.unsubscribe_all(&self.id);
        debug!("Cleaned up {} ({removed} membership(s))", self.id);
    }
}
