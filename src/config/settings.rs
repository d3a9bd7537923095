use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::broker::Framing;

/// Top-level configuration settings for the application.
///
/// Includes settings for both the listener and the broker core.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
}

/// Which transport adapter the listener binds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Tcp,
    Udp,
    #[serde(alias = "websocket")]
    Ws,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Tcp => "tcp",
            Transport::Udp => "udp",
            Transport::Ws => "ws",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration settings for the listener.
///
/// Defines the host, port and transport the broker will bind to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub transport: Transport,
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration settings for the broker.
///
/// Controls connection limits, line and topic bounds, per-subscriber
/// buffering, the delivery framing and the optional idle timeout.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub max_connections: usize,
    pub max_line_bytes: usize,
    pub max_topic_bytes: usize,
    pub outbound_queue: usize,
    pub framing: Framing,
    pub idle_timeout_secs: Option<u64>,
}

impl BrokerSettings {
    /// `None` (or zero seconds) disables the idle timeout.
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
}

/// Partial server settings.
#[derive(Debug, Default, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub transport: Option<Transport>,
}

/// Partial broker settings.
#[derive(Debug, Default, Deserialize)]
pub struct PartialBrokerSettings {
    pub max_connections: Option<usize>,
    pub max_line_bytes: Option<usize>,
    pub max_topic_bytes: Option<usize>,
    pub outbound_queue: Option<usize>,
    pub framing: Option<Framing>,
    pub idle_timeout_secs: Option<u64>,
}

/// Provides default values for `Settings`.
///
/// Ensures the application has sensible defaults if no configuration is provided.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 7878,
                transport: Transport::Tcp,
            },
            broker: BrokerSettings::default(),
        }
    }
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            max_connections: 1000,
            max_line_bytes: 4096,
            max_topic_bytes: 127,
            outbound_queue: 256,
            framing: Framing::Prefixed,
            idle_timeout_secs: None,
        }
    }
}
