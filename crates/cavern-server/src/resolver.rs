//! Turning an accepted turn into world changes.

use cavern_net::ConnectionId;
use cavern_protocol::catalogue::{TurnRequest, TurnResult};

use crate::world::GridWorld;

/// Applies the holder's action to the world.
///
/// Only called for actions from the actor holding the turn. The returned
/// result is sent back to the acting client as is.
pub trait ActionResolver: Send + 'static {
    fn resolve(&mut self, world: &mut GridWorld, actor: ConnectionId, request: &TurnRequest) -> TurnResult;
}

/// Accepts every action and leaves the world alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingResolver;

impl ActionResolver for LoggingResolver {
    fn resolve(&mut self, world: &mut GridWorld, actor: ConnectionId, request: &TurnRequest) -> TurnResult {
        tracing::info!(%actor, position = ?world.actor_position(actor), ?request, "turn played");
        TurnResult::accepted()
    }
}

impl<F> ActionResolver for F
where
    F: FnMut(&mut GridWorld, ConnectionId, &TurnRequest) -> TurnResult + Send + 'static,
{
    fn resolve(&mut self, world: &mut GridWorld, actor: ConnectionId, request: &TurnRequest) -> TurnResult {
        self(world, actor, request)
    }
}
