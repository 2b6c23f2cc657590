//! Transport abstraction layer for Cavern.
//!
//! A [`Transport`] accepts [`Handshake`]s, which complete into
//! [`Connection`]s. The accept step only takes the raw socket, so callers
//! can run the slow part of the opening exchange off the accept loop.
//! A connection is immediately
//! split into a [`FrameReader`] and a [`FrameWriter`] so that reading and
//! writing can run in separate tasks without contending for a lock.
//!
//! Every async method returns a `Send` future, so trait objects are not
//! needed to hand the halves to `tokio::spawn`.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    WebSocketConnection, WebSocketHandshake, WebSocketReader, WebSocketTransport, WebSocketWriter,
};

use std::future::Future;
use std::net::SocketAddr;

/// Accepts new incoming connections.
pub trait Transport: Send + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;

    /// An accepted socket whose opening exchange has not run yet.
    type Handshake: Handshake<Connection = Self::Connection>;

    /// Waits for the next incoming socket.
    ///
    /// Returns as soon as the peer is accepted; the handshake is left to
    /// the caller.
    fn accept(&mut self) -> impl Future<Output = Result<Self::Handshake, TransportError>> + Send;

    /// The address the transport is listening on.
    fn local_addr(&self) -> Result<SocketAddr, TransportError>;
}

/// An accepted peer that still has to finish its opening exchange.
pub trait Handshake: Send + 'static {
    type Connection: Connection;

    fn peer_addr(&self) -> Option<SocketAddr>;

    /// Runs the opening exchange. A peer that never answers keeps this
    /// pending, so callers bound it with a timeout.
    fn complete(self) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// An established, not yet split connection.
pub trait Connection: Send + 'static {
    type Reader: FrameReader;
    type Writer: FrameWriter;

    /// The remote address, when the transport knows it.
    fn peer_addr(&self) -> Option<SocketAddr>;

    /// Splits into independently owned halves.
    fn into_split(self) -> (Self::Writer, Self::Reader);
}

/// The receiving half of a connection.
pub trait FrameReader: Send + 'static {
    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(&mut self) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;
}

/// The sending half of a connection.
pub trait FrameWriter: Send + 'static {
    /// Sends one frame to the remote peer.
    fn send(&mut self, frame: Vec<u8>) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Starts a clean close of the connection.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
}
