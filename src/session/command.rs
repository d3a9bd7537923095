//! Protocol lines
//!
//! ```text
//! SUBSCRIBE <topic>     first line, or any later line of a subscriber
//! PUBLISH <topic>       first line only
//! MESSAGE <payload>     publisher lines after the first
//! ```
//!
//! `SUB`, `PUB` and `MSG` are accepted as short forms. Tokens are
//! case-sensitive. Topics longer than the configured maximum are cut to it.

use crate::utils::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Subscribe,
    Publish,
}

impl Role {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "SUBSCRIBE" | "SUB" => Some(Role::Subscribe),
            "PUBLISH" | "PUB" => Some(Role::Publish),
            _ => None,
        }
    }
}

/// A parsed first line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleLine {
    pub role: Role,
    pub topic: String,
}

/// Parse `<ROLE> <topic>`: exactly two whitespace-separated tokens.
pub fn parse_role_line(line: &str, max_topic_bytes: usize) -> Result<RoleLine, ProtocolError> {
    let mut tokens = line.split_whitespace();
    let (Some(role), Some(topic), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(ProtocolError::Malformed);
    };

    let role = Role::from_token(role).ok_or_else(|| ProtocolError::UnknownRole(role.to_string()))?;
    Ok(RoleLine {
        role,
        topic: truncate_topic(topic, max_topic_bytes).to_string(),
    })
}

/// The topic of a follow-up `SUBSCRIBE <topic>` line, if it is one.
pub fn parse_subscribe(line: &str, max_topic_bytes: usize) -> Option<&str> {
    let mut tokens = line.split_whitespace();
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(role), Some(topic), None) if Role::from_token(role) == Some(Role::Subscribe) => {
            Some(truncate_topic(topic, max_topic_bytes))
        }
        _ => None,
    }
}

/// At most `max_bytes` of `topic`, cut on a character boundary.
fn truncate_topic(topic: &str, max_bytes: usize) -> &str {
    if topic.len() <= max_bytes {
        return topic;
    }
    let mut cut = max_bytes;
    while !topic.is_char_boundary(cut) {
        cut -= 1;
    }
    &topic[..cut]
}

/// The payload of a `MESSAGE <payload>` line: everything after the first
/// space, inner spaces kept.
pub fn parse_message(line: &str) -> Option<&str> {
    line.strip_prefix("MESSAGE ")
        .or_else(|| line.strip_prefix("MSG "))
}
