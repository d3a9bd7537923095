use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A published message on its way to subscribers.
///
/// # Fields
///
/// - `topic` - The name of the topic this message belongs to.
/// - `payload` - The text after `MESSAGE ` on the publisher's line.
/// - `published_at` - When the broker accepted the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub topic: String,
    pub payload: String,
    pub published_at: DateTime<Utc>,
}

impl Message {
    pub fn new(topic: &str, payload: &str) -> Self {
        Self {
            topic: topic.to_string(),
            payload: payload.to_string(),
            published_at: Utc::now(),
        }
    }
}

/// How a delivered message is written on a subscriber's connection.
///
/// Fixed for one deployment through `broker.framing`; subscribers depend on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// `<topic>: <payload>`
    #[default]
    Prefixed,
    /// `<payload>`
    Raw,
    /// The `Message` as one JSON object.
    Json,
}

impl Framing {
    pub fn render(&self, msg: &Message) -> Result<String, serde_json::Error> {
        match self {
            Framing::Prefixed => Ok(format!("{}: {}", msg.topic, msg.payload)),
            Framing::Raw => Ok(msg.payload.clone()),
            Framing::Json => serde_json::to_string(msg),
        }
    }
}
