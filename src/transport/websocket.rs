//! WebSocket transport
//!
//! Each inbound text (or binary) frame is one protocol line; each outbound
//! line is one text frame. A close frame or a closed stream is EOF.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{WebSocketStream, accept_async};
use tungstenite::protocol::Message as WsMessage;

use crate::client::{Connection, LineSink, LineSource, normalize_line};
use crate::utils::ConnectionError;

type WsStream = WebSocketStream<TcpStream>;

pub struct WsLineSource {
    stream: SplitStream<WsStream>,
    max_line_bytes: usize,
}

#[async_trait]
impl LineSource for WsLineSource {
    async fn receive_line(&mut self) -> Result<Option<String>, ConnectionError> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => {
                    return Ok(Some(normalize_line(text.as_bytes(), self.max_line_bytes)));
                }
                Ok(WsMessage::Binary(data)) => {
                    return Ok(Some(normalize_line(&data, self.max_line_bytes)));
                }
                Ok(WsMessage::Close(_)) => return Ok(None),
                // ping/pong are answered by tungstenite
                Ok(_) => continue,
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }
}

pub struct WsLineSink {
    sink: SplitSink<WsStream, WsMessage>,
}

#[async_trait]
impl LineSink for WsLineSink {
    async fn send(&mut self, line: &str) -> Result<(), ConnectionError> {
        self.sink.send(WsMessage::text(line.to_string())).await?;
        Ok(())
    }

    async fn close(&mut self) {
        let _ = self.sink.close().await;
    }
}

/// Run the WebSocket handshake on an accepted stream.
pub async fn connection(
    stream: TcpStream,
    max_line_bytes: usize,
) -> Result<Connection, ConnectionError> {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let ws_stream = accept_async(stream).await?;
    let (sink, stream) = ws_stream.split();
    Ok(Connection::new(
        peer,
        WsLineSource {
            stream,
            max_line_bytes,
        },
        WsLineSink { sink },
    ))
}
