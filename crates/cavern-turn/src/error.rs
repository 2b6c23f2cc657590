//! Error types for the turn layer.

/// Errors returned by [`TurnSequencer`](crate::TurnSequencer) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    /// An action came from an actor that does not hold the turn.
    #[error("not your turn")]
    NotYourTurn,

    /// The actor is not registered.
    #[error("actor {0} is not registered")]
    UnknownActor(String),

    /// The actor is registered already.
    #[error("actor {0} is already registered")]
    AlreadyRegistered(String),
}
