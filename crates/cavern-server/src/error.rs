//! Unified error type for the server.

use cavern_net::NetError;
use cavern_protocol::ProtocolError;
use cavern_turn::TurnError;

use crate::world::WorldError;

/// Everything that can go wrong while starting or running the server.
///
/// Each variant wraps the error of one layer, so `?` converts them
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Net(#[from] NetError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Turn(#[from] TurnError),

    #[error(transparent)]
    World(#[from] WorldError),
}
