use cavern_protocol::ProtocolError;
use cavern_transport::TransportError;

use crate::ConnectionId;

/// Errors surfaced by the network bridge to the tick loop.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Binding, connecting or writing failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A message could not be encoded (usually: its type is not registered).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// No live connection has this id.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),
}
