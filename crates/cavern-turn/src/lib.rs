//! Round-robin turn sequencing for Cavern actors.
//!
//! A [`TurnSequencer`] grants exclusive action rights to one registered
//! actor at a time, in registration order. It never talks to the network
//! itself: operations that hand the turn to someone return a
//! [`PrepareTurn`] directive, and the caller turns that into a
//! `PrepareTurnRequest` for the new holder with the help of a
//! [`Perception`] collaborator.
//!
//! ```text
//!            register (first)
//!   Idle ──────────────────────▶ ActorTurn(0)
//!    ▲                               │  advance / accepted action
//!    │ unregister (last)             ▼
//!    └────────────────────────── ActorTurn((i + 1) mod n)
//! ```
//!
//! The sequencer is owned by the tick loop and is not shared between
//! threads.

mod error;

use std::fmt;

use cavern_protocol::catalogue::{Actor, PrepareTurnRequest};

pub use error::TurnError;

// ---------------------------------------------------------------------------
// State and policy
// ---------------------------------------------------------------------------

/// Who may act right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Nobody is registered.
    Idle,
    /// The actor at this registry index holds the turn.
    ActorTurn(usize),
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::ActorTurn(i) => write!(f, "actor turn #{i}"),
        }
    }
}

/// What happens after the holder's action is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TurnPolicy {
    /// The turn passes to the next actor right away.
    #[default]
    AutoAdvance,
    /// The turn stays put until the holder calls
    /// [`TurnSequencer::end_turn`] or the caller forces
    /// [`TurnSequencer::advance`].
    Manual,
}

// ---------------------------------------------------------------------------
// Directives
// ---------------------------------------------------------------------------

/// Tells the caller that `actor` has just been handed the turn.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "the new holder has to be told it may act"]
pub struct PrepareTurn<A> {
    actor: A,
}

impl<A> PrepareTurn<A> {
    /// The new holder.
    pub fn actor(&self) -> &A {
        &self.actor
    }

    pub fn into_actor(self) -> A {
        self.actor
    }

    /// Builds the request for the new holder from what it currently
    /// perceives. `None` when the perception has no body for the actor.
    pub fn request<P>(&self, perception: &P) -> Option<PrepareTurnRequest>
    where
        P: Perception<A> + ?Sized,
    {
        perception
            .perceive(&self.actor)
            .map(|actor| PrepareTurnRequest { actor })
    }
}

/// Supplies the senses and condition sent to an actor when its turn starts.
pub trait Perception<A> {
    fn perceive(&self, actor: &A) -> Option<Actor>;
}

/// The outcome of an accepted action.
#[derive(Debug)]
pub struct Accepted<A, R> {
    /// Whatever the resolver returned.
    pub outcome: R,
    /// Set when the action moved the turn on.
    pub next: Option<PrepareTurn<A>>,
}

// ---------------------------------------------------------------------------
// TurnSequencer
// ---------------------------------------------------------------------------

/// Round-robin turn state machine over actor handles of type `A`.
///
/// # Example
///
/// ```rust
/// use cavern_turn::{TurnError, TurnSequencer, TurnState};
///
/// let mut turns = TurnSequencer::new();
/// let first = turns.register("a").unwrap();
/// assert_eq!(first.map(|p| *p.actor()), Some("a"));
/// turns.register("b").unwrap();
///
/// let err = turns.submit_turn_action(&"b", (), |_, ()| ()).unwrap_err();
/// assert_eq!(err, TurnError::NotYourTurn);
///
/// turns.submit_turn_action(&"a", (), |_, ()| ()).unwrap();
/// assert_eq!(turns.state(), TurnState::ActorTurn(1));
/// ```
#[derive(Debug, Clone)]
pub struct TurnSequencer<A> {
    actors: Vec<A>,
    holder: Option<usize>,
    policy: TurnPolicy,
}

impl<A> TurnSequencer<A>
where
    A: Clone + Eq + fmt::Debug,
{
    pub fn new() -> Self {
        Self::with_policy(TurnPolicy::default())
    }

    pub fn with_policy(policy: TurnPolicy) -> Self {
        Self {
            actors: Vec::new(),
            holder: None,
            policy,
        }
    }

    pub fn policy(&self) -> TurnPolicy {
        self.policy
    }

    /// Appends `actor` to the rotation.
    ///
    /// The first actor to join an idle sequencer takes the turn at once.
    pub fn register(&mut self, actor: A) -> Result<Option<PrepareTurn<A>>, TurnError> {
        if self.actors.contains(&actor) {
            return Err(TurnError::AlreadyRegistered(format!("{actor:?}")));
        }
        tracing::debug!(?actor, "actor registered");
        self.actors.push(actor);

        if self.holder.is_none() {
            self.holder = Some(0);
            return Ok(self.directive());
        }
        Ok(None)
    }

    /// Removes `actor` from the rotation.
    ///
    /// Removing an actor ahead of the holder keeps the same holder. Removing
    /// the holder passes the turn to the next survivor in registration
    /// order, wrapping around, and returns the directive for it.
    pub fn unregister(&mut self, actor: &A) -> Result<Option<PrepareTurn<A>>, TurnError> {
        let pos = self
            .actors
            .iter()
            .position(|a| a == actor)
            .ok_or_else(|| TurnError::UnknownActor(format!("{actor:?}")))?;
        self.actors.remove(pos);
        tracing::debug!(?actor, "actor unregistered");

        if self.actors.is_empty() {
            self.holder = None;
            return Ok(None);
        }

        match self.holder {
            Some(h) if pos < h => {
                self.holder = Some(h - 1);
                Ok(None)
            }
            Some(h) if pos == h => {
                self.holder = Some(h % self.actors.len());
                Ok(self.directive())
            }
            _ => Ok(None),
        }
    }

    /// Passes the turn to the next actor. `None` when idle.
    pub fn advance(&mut self) -> Option<PrepareTurn<A>> {
        let i = self.holder?;
        self.holder = Some((i + 1) % self.actors.len());
        self.directive()
    }

    /// Hands `action` to `resolve` if `actor` holds the turn.
    ///
    /// Anyone else gets [`TurnError::NotYourTurn`] and nothing changes.
    /// Under [`TurnPolicy::AutoAdvance`] an accepted action also advances
    /// the turn.
    pub fn submit_turn_action<T, R>(
        &mut self,
        actor: &A,
        action: T,
        resolve: impl FnOnce(&A, T) -> R,
    ) -> Result<Accepted<A, R>, TurnError> {
        if self.holder() != Some(actor) {
            tracing::debug!(?actor, holder = ?self.holder(), "out of turn action rejected");
            return Err(TurnError::NotYourTurn);
        }

        let outcome = resolve(actor, action);
        let next = match self.policy {
            TurnPolicy::AutoAdvance => self.advance(),
            TurnPolicy::Manual => None,
        };
        Ok(Accepted { outcome, next })
    }

    /// Gives up the turn `actor` holds, passing it to the next actor.
    ///
    /// Works under either policy. Anyone but the holder gets
    /// [`TurnError::NotYourTurn`].
    pub fn end_turn(&mut self, actor: &A) -> Result<Option<PrepareTurn<A>>, TurnError> {
        if self.holder() != Some(actor) {
            tracing::debug!(?actor, holder = ?self.holder(), "out of turn end rejected");
            return Err(TurnError::NotYourTurn);
        }
        Ok(self.advance())
    }

    /// The actor holding the turn.
    pub fn holder(&self) -> Option<&A> {
        self.holder.and_then(|i| self.actors.get(i))
    }

    pub fn state(&self) -> TurnState {
        match self.holder {
            Some(i) => TurnState::ActorTurn(i),
            None => TurnState::Idle,
        }
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Registered actors in turn order.
    pub fn actors(&self) -> &[A] {
        &self.actors
    }

    fn directive(&self) -> Option<PrepareTurn<A>> {
        let actor = self.holder()?.clone();
        tracing::debug!(?actor, "turn handed over");
        Some(PrepareTurn { actor })
    }
}

impl<A> Default for TurnSequencer<A>
where
    A: Clone + Eq + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
