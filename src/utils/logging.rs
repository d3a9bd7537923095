/// Install the global `fmt` subscriber, capped at `default_level`.
///
/// Accepts `error`, `warn`, `info`, `debug` and `trace` in any case; anything
/// else means `info`. A second call is a no-op.
pub fn init(default_level: &str) {
    let lvl = match default_level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" | "warning" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    };

    let _ = tracing_subscriber::fmt()
        .with_max_level(lvl)
        .with_target(false)
        .try_init();
}
