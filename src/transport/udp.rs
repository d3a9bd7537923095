//! UDP datagram transport
//!
//! Each inbound datagram is one protocol line and each source address is one
//! logical connection. The listener keeps a table of peers and forwards
//! datagrams to the matching session through a channel; replies and
//! deliveries go out through the shared socket.
//!
//! A datagram peer never signals EOF. A publisher session ends through the
//! idle timeout; a subscriber stays registered until a send to it fails. A
//! later datagram from the same address starts a new session once the old
//! one has ended.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, warn};

use crate::broker::Registry;
use crate::client::{Connection, LineSink, LineSource, normalize_line};
use crate::config::BrokerSettings;
use crate::session::{Session, SessionConfig};
use crate::transport::server::{SERVER_BUSY, connection_limiter};
use crate::utils::ConnectionError;

/// Idle timeout for datagram publishers when none is configured.
pub const DEFAULT_DATAGRAM_IDLE: Duration = Duration::from_secs(300);

const PEER_QUEUE: usize = 64;

pub struct DatagramSource {
    rx: mpsc::Receiver<String>,
}

#[async_trait]
impl LineSource for DatagramSource {
    async fn receive_line(&mut self) -> Result<Option<String>, ConnectionError> {
        Ok(self.rx.recv().await)
    }
}

pub struct DatagramSink {
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
}

#[async_trait]
impl LineSink for DatagramSink {
    async fn send(&mut self, line: &str) -> Result<(), ConnectionError> {
        let mut framed = String::with_capacity(line.len() + 1);
        framed.push_str(line);
        framed.push('\n');
        self.socket.send_to(framed.as_bytes(), self.peer).await?;
        Ok(())
    }
}

pub async fn serve(socket: UdpSocket, registry: Arc<Registry>, settings: BrokerSettings) {
    let socket = Arc::new(socket);
    let limiter = connection_limiter(&settings);
    let mut session_config = SessionConfig::from(&settings);
    session_config.idle_timeout = Some(settings.idle_timeout().unwrap_or(DEFAULT_DATAGRAM_IDLE));

    let mut peers: HashMap<SocketAddr, mpsc::Sender<String>> = HashMap::new();
    let mut buf = vec![0u8; settings.max_line_bytes];

    loop {
        let (n, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                warn!("UDP receive failed: {e}");
                continue;
            }
        };
        let line = normalize_line(&buf[..n], settings.max_line_bytes);

        if let Some(tx) = peers.get(&peer) {
            match tx.try_send(line) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => {
                    warn!("Dropping datagram from {peer}: session is behind");
                    continue;
                }
                Err(TrySendError::Closed(line)) => {
                    peers.remove(&peer);
                    attach(peer, line, &socket, &limiter, &registry, &session_config, &mut peers)
                        .await;
                }
            }
        } else {
            peers.retain(|_, tx| !tx.is_closed());
            attach(peer, line, &socket, &limiter, &registry, &session_config, &mut peers).await;
        }
    }
}

async fn attach(
    peer: SocketAddr,
    first: String,
    socket: &Arc<UdpSocket>,
    limiter: &Arc<Semaphore>,
    registry: &Arc<Registry>,
    config: &SessionConfig,
    peers: &mut HashMap<SocketAddr, mpsc::Sender<String>>,
) {
    let Ok(permit) = Arc::clone(limiter).try_acquire_owned() else {
        warn!("Connection limit reached, rejecting datagram peer {peer}");
        let mut reply = String::from(SERVER_BUSY);
        reply.push('\n');
        if let Err(e) = socket.send_to(reply.as_bytes(), peer).await {
            debug!("Failed to reject {peer}: {e}");
        }
        return;
    };

    let (tx, rx) = mpsc::channel(PEER_QUEUE);
    // fresh channel, so the first line always fits
    let _ = tx.try_send(first);
    peers.insert(peer, tx);

    let conn = Connection::new(
        peer.to_string(),
        DatagramSource { rx },
        DatagramSink {
            socket: Arc::clone(socket),
            peer,
        },
    );
    let session = Session::new(conn, Arc::clone(registry), config.clone());
    let id = session.id();
    info!("Datagram peer {peer} attached as {id}");

    tokio::spawn(async move {
        let _permit = permit;
        let end = session.run().await;
        info!("Session {id} ({peer}) closed: {end:?}");
    });
}
