//! Lifecycle pseudo-messages.
//!
//! These never travel on the wire. The bridge synthesizes them into the
//! inbound queue so that connection changes reach the tick loop in order
//! with ordinary messages and through the same [`Router`](crate::Router).

use std::net::SocketAddr;

/// Client side: the connection to the server is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connected;

/// Client side: the connection to the server is gone, or never came up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnected;

/// Server side: a peer was accepted. Dispatched with its connection id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConnected {
    pub addr: Option<SocketAddr>,
}

/// Server side: a peer is gone. Dispatched with its old connection id.
///
/// The peer has already been removed from the network when this is
/// dispatched, so its session data travels with the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientDisconnected<S> {
    pub session: S,
}
