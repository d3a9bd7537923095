//! CLI for publine
//!
//! Subcommands:
//! - `serve`: bind the configured transport and run the broker

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser};
use publine::broker::Registry;
use publine::config::{Transport, load_config};
use publine::transport::Listener;
use publine::utils::{ServerError, logging};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "publine", version, about = "Topic-based line protocol pub/sub broker")]
enum Command {
    /// Run the broker
    Serve(ServeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Transport to listen on (overrides configuration)
    #[arg(long, value_enum)]
    transport: Option<Transport>,
    /// Host to bind (overrides configuration)
    #[arg(long)]
    host: Option<String>,
    /// Port to bind (overrides configuration)
    #[arg(long)]
    port: Option<u16>,
    /// Log level: error, warn, info, debug or trace
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    // a missing .env file is fine
    let _ = dotenvy::dotenv();

    let Command::Serve(args) = Command::parse();
    logging::init(&args.log_level);

    match run_server(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_server(args: ServeArgs) -> Result<(), ServerError> {
    let mut config = load_config()?;
    if let Some(transport) = args.transport {
        config.server.transport = transport;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let addr = config.server.addr();
    let registry = Arc::new(Registry::with_framing(config.broker.framing));
    let listener = Listener::bind(config.server.transport, &addr).await?;
    info!(
        "Broker listening on {}://{addr} (framing: {:?})",
        config.server.transport, config.broker.framing
    );

    tokio::select! {
        _ = listener.serve(registry, config.broker.clone()) => {
            error!("Listener exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}
