mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{BrokerSettings, ServerSettings, Settings, Transport};

/// Loads the configuration from `config/default` (any format the `config`
/// crate understands, optional) and `PUBLINE_*` environment variables.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from("config/default")
}

/// Like `load_config`, reading the file source from `path` instead.
///
/// Environment variables use `__` between levels, for example
/// `PUBLINE_SERVER__PORT=9000` or `PUBLINE_BROKER__MAX_CONNECTIONS=10`.
/// Values from the environment win over the file; anything unset falls back
/// to `Settings::default()`.
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix("PUBLINE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();
    let server = partial.server.unwrap_or_default();
    let broker = partial.broker.unwrap_or_default();

    Ok(Settings {
        server: ServerSettings {
            host: server.host.unwrap_or(default.server.host),
            port: server.port.unwrap_or(default.server.port),
            transport: server.transport.unwrap_or(default.server.transport),
        },
        broker: BrokerSettings {
            max_connections: broker
                .max_connections
                .unwrap_or(default.broker.max_connections),
            max_line_bytes: broker
                .max_line_bytes
                .unwrap_or(default.broker.max_line_bytes)
                .max(1),
            max_topic_bytes: broker
                .max_topic_bytes
                .unwrap_or(default.broker.max_topic_bytes)
                .max(1),
            outbound_queue: broker
                .outbound_queue
                .unwrap_or(default.broker.outbound_queue)
                .max(1),
            framing: broker.framing.unwrap_or(default.broker.framing),
            idle_timeout_secs: broker.idle_timeout_secs.or(default.broker.idle_timeout_secs),
        },
    })
}

#[cfg(test)]
mod tests;
