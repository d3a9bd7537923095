//! Listener
//!
//! Binds the configured transport and runs its accept loop. Every accepted
//! peer gets its own task running a `Session`. A semaphore caps how many
//! connections are served at once; a peer over the limit is told
//! `ERR server busy` and closed.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::broker::Registry;
use crate::client::Connection;
use crate::config::{BrokerSettings, Transport};
use crate::session::{Session, SessionConfig};
use crate::transport::{tcp, udp, websocket};
use crate::utils::ServerError;

/// Reply sent to a peer rejected by the connection limit.
pub const SERVER_BUSY: &str = "ERR server busy";

pub(crate) fn connection_limiter(settings: &BrokerSettings) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(settings.max_connections.min(Semaphore::MAX_PERMITS)))
}

pub enum Listener {
    Tcp(TcpListener),
    Udp(UdpSocket),
    WebSocket(TcpListener),
}

impl Listener {
    pub async fn bind(transport: Transport, addr: &str) -> Result<Self, ServerError> {
        let bind_err = |source: io::Error| ServerError::Bind {
            transport: transport.as_str(),
            addr: addr.to_string(),
            source,
        };
        let listener = match transport {
            Transport::Tcp => Listener::Tcp(TcpListener::bind(addr).await.map_err(bind_err)?),
            Transport::Udp => Listener::Udp(UdpSocket::bind(addr).await.map_err(bind_err)?),
            Transport::Ws => Listener::WebSocket(TcpListener::bind(addr).await.map_err(bind_err)?),
        };
        Ok(listener)
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        match self {
            Listener::Tcp(listener) | Listener::WebSocket(listener) => listener.local_addr(),
            Listener::Udp(socket) => socket.local_addr(),
        }
    }

    /// Serve connections until the task is dropped.
    pub async fn serve(self, registry: Arc<Registry>, settings: BrokerSettings) {
        match self {
            Listener::Tcp(listener) => serve_stream(listener, false, registry, settings).await,
            Listener::WebSocket(listener) => serve_stream(listener, true, registry, settings).await,
            Listener::Udp(socket) => udp::serve(socket, registry, settings).await,
        }
    }
}

async fn serve_stream(
    listener: TcpListener,
    is_websocket: bool,
    registry: Arc<Registry>,
    settings: BrokerSettings,
) {
    let limiter = connection_limiter(&settings);
    let config = SessionConfig::from(&settings);
    let max_line_bytes = settings.max_line_bytes;

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Accept failed: {e}");
                continue;
            }
        };
        let permit = Arc::clone(&limiter).try_acquire_owned().ok();
        let registry = Arc::clone(&registry);
        let config = config.clone();

        tokio::spawn(async move {
            let conn = if is_websocket {
                match websocket::connection(stream, max_line_bytes).await {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("WebSocket handshake error from {peer}: {e}");
                        return;
                    }
                }
            } else {
                tcp::connection(stream, peer, max_line_bytes)
            };
            run_session(conn, permit, registry, config).await;
        });
    }
}

async fn run_session(
    mut conn: Connection,
    permit: Option<OwnedSemaphorePermit>,
    registry: Arc<Registry>,
    config: SessionConfig,
) {
    let Some(_permit) = permit else {
        warn!("Connection limit reached, rejecting {}", conn.peer);
        if let Err(e) = conn.sink.send(SERVER_BUSY).await {
            debug!("Failed to reject {}: {e}", conn.peer);
        }
        conn.sink.close().await;
        return;
    };

    let id = conn.id;
    let peer = conn.peer.clone();
    info!("{id} connected from {peer}");
    let end = Session::new(conn, registry, config).run().await;
    info!("Session {id} ({peer}) closed: {end:?}");
}
