//! WebSocket transport implementation using `tokio-tungstenite`.

use std::io;
use std::net::SocketAddr;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, FrameReader, FrameWriter, Handshake, Transport, TransportError};

/// Accepted and dialed sockets share one stream type, so both ends of a
/// connection run the same reader and writer code.
type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    ///
    /// Port `0` picks a free port; read it back with
    /// [`local_addr`](Transport::local_addr).
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr = ?listener.local_addr().ok(), "WebSocket transport listening");
        Ok(Self { listener })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Handshake = WebSocketHandshake;

    async fn accept(&mut self) -> Result<Self::Handshake, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::trace!(%addr, "accepted TCP connection");
        Ok(WebSocketHandshake { stream, addr })
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)
    }
}

/// A TCP peer that has not sent its upgrade request yet.
pub struct WebSocketHandshake {
    stream: TcpStream,
    addr: SocketAddr,
}

impl Handshake for WebSocketHandshake {
    type Connection = WebSocketConnection;

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.addr)
    }

    async fn complete(self) -> Result<Self::Connection, TransportError> {
        let ws = tokio_tungstenite::accept_async(MaybeTlsStream::Plain(self.stream))
            .await
            .map_err(|e| {
                TransportError::AcceptFailed(io::Error::new(io::ErrorKind::ConnectionRefused, e))
            })?;

        tracing::debug!(addr = %self.addr, "accepted WebSocket connection");
        Ok(WebSocketConnection {
            ws,
            peer: Some(self.addr),
        })
    }
}

/// A single WebSocket connection, before it is split.
pub struct WebSocketConnection {
    ws: WsStream,
    peer: Option<SocketAddr>,
}

impl WebSocketConnection {
    /// Opens a client connection to `url` (e.g. `ws://127.0.0.1:8765`).
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let (ws, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            TransportError::ConnectFailed(io::Error::new(io::ErrorKind::ConnectionRefused, e))
        })?;

        let peer = match ws.get_ref() {
            MaybeTlsStream::Plain(tcp) => tcp.peer_addr().ok(),
            _ => None,
        };
        tracing::debug!(url, "opened WebSocket connection");
        Ok(Self { ws, peer })
    }
}

impl Connection for WebSocketConnection {
    type Reader = WebSocketReader;
    type Writer = WebSocketWriter;

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    fn into_split(self) -> (Self::Writer, Self::Reader) {
        let (sink, stream) = self.ws.split();
        (WebSocketWriter { sink }, WebSocketReader { stream })
    }
}

/// Receiving half of a [`WebSocketConnection`].
pub struct WebSocketReader {
    stream: SplitStream<WsStream>,
}

impl FrameReader for WebSocketReader {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_bytes().to_vec())),
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.into())),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
    }
}

/// Sending half of a [`WebSocketConnection`].
pub struct WebSocketWriter {
    sink: SplitSink<WsStream, Message>,
}

impl FrameWriter for WebSocketWriter {
    async fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        // Encoded envelopes are JSON, so they normally go out as text frames.
        let msg = match String::from_utf8(frame) {
            Ok(text) => Message::text(text),
            Err(e) => Message::binary(e.into_bytes()),
        };
        self.sink.send(msg).await.map_err(|e| {
            TransportError::SendFailed(io::Error::new(io::ErrorKind::BrokenPipe, e))
        })
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.sink.close().await.map_err(|e| {
            TransportError::SendFailed(io::Error::new(io::ErrorKind::BrokenPipe, e))
        })
    }
}
