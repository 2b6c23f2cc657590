//! Game state, message handlers and the tick loop.

use std::net::SocketAddr;
use std::sync::Arc;

use cavern_net::{ClientConnected, ClientDisconnected, ConnectionId, Router, ServerNetwork};
use cavern_protocol::catalogue::{
    self, Actor, ActorRequest, ActorResponse, Condition, DataRequest, EndTurn, Introduction,
    IntroductionRequest, Senses, TurnRequest, TurnResult,
};
use cavern_protocol::{Message, Protocol};
use cavern_turn::{Perception, PrepareTurn, TurnSequencer};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::time::{self, MissedTickBehavior};

use crate::resolver::{ActionResolver, LoggingResolver};
use crate::sensing::RangeSensing;
use crate::world::GridWorld;
use crate::{ServerConfig, ServerError};

/// Per-connection data kept by the tick loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerSession {
    /// Set once the client has introduced itself.
    pub name: Option<String>,
    /// Whether the client has an actor in the world.
    pub has_actor: bool,
}

/// Everything the handlers mutate.
pub struct Game {
    pub network: ServerNetwork<PeerSession>,
    pub world: GridWorld,
    pub turns: TurnSequencer<ConnectionId>,
    sensing: RangeSensing,
    resolver: Box<dyn ActionResolver>,
    rng: StdRng,
    name: String,
}

impl Game {
    pub fn sensing(&self) -> &RangeSensing {
        &self.sensing
    }

    /// Queues `message` for `id`. Failures are logged, not returned: the
    /// peer is on its way out and its disconnect event will follow.
    fn reply<M: Message>(&self, id: ConnectionId, message: &M) {
        if let Err(e) = self.network.send_to_id(id, message) {
            tracing::warn!(conn_id = %id, error = %e, "could not send reply");
        }
    }

    fn broadcast_world(&self) {
        if let Err(e) = self.network.broadcast(&self.world.data_response()) {
            tracing::warn!(error = %e, "could not broadcast world");
        }
    }

    /// Tells the new holder its turn has started.
    fn prepare_turn(&self, directive: PrepareTurn<ConnectionId>) {
        let id = *directive.actor();
        match directive.request(&self.sensing.over(&self.world)) {
            Some(request) => {
                tracing::debug!(conn_id = %id, "turn prepared");
                self.reply(id, &request);
            }
            None => tracing::warn!(conn_id = %id, "turn holder has no actor in the world"),
        }
    }

    fn perceive(&self, id: ConnectionId) -> Option<Actor> {
        self.sensing.over(&self.world).perceive(&id)
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn on_client_connected(_game: &mut Game, event: &ClientConnected, id: ConnectionId) {
    tracing::info!(conn_id = %id, addr = ?event.addr, "client joined");
}

fn on_client_disconnected(game: &mut Game, event: &ClientDisconnected<PeerSession>, id: ConnectionId) {
    tracing::info!(conn_id = %id, name = ?event.session.name, "client left");
    if !event.session.has_actor {
        return;
    }

    let next = match game.turns.unregister(&id) {
        Ok(next) => next,
        Err(e) => {
            tracing::warn!(conn_id = %id, error = %e, "actor was not in the turn order");
            None
        }
    };
    if game.world.remove_actor(id).is_none() {
        tracing::warn!(conn_id = %id, "actor was not in the world");
    }
    game.broadcast_world();
    if let Some(directive) = next {
        game.prepare_turn(directive);
    }
}

fn on_introduction_request(game: &mut Game, _: &IntroductionRequest, id: ConnectionId) {
    let intro = Introduction {
        name: game.name.clone(),
    };
    game.reply(id, &intro);
}

fn on_introduction(game: &mut Game, intro: &Introduction, id: ConnectionId) {
    tracing::info!(conn_id = %id, name = %intro.name, "client introduced itself");
    if let Some(session) = game.network.session_mut(id) {
        session.name = Some(intro.name.clone());
    }
}

fn on_actor_request(game: &mut Game, request: &ActorRequest, id: ConnectionId) {
    let already = game.network.peer(id).is_some_and(|p| p.session().has_actor);
    if already {
        tracing::warn!(conn_id = %id, "second actor requested");
        if let Some(actor) = game.perceive(id) {
            game.reply(id, &ActorResponse { success: false, actor });
        }
        return;
    }

    let (x, y) = match game.world.spawn_actor(id, request.kind, &mut game.rng) {
        Ok(spot) => spot,
        Err(e) => {
            tracing::warn!(conn_id = %id, error = %e, "could not spawn actor");
            let actor = Actor {
                kind: request.kind.to_string(),
                x: -1,
                y: -1,
                senses: Senses::default(),
                condition: Condition::default(),
            };
            game.reply(id, &ActorResponse { success: false, actor });
            return;
        }
    };
    tracing::info!(conn_id = %id, kind = %request.kind, x, y, "actor spawned");

    if let Some(session) = game.network.session_mut(id) {
        session.has_actor = true;
    }
    if let Some(actor) = game.perceive(id) {
        game.reply(id, &ActorResponse { success: true, actor });
    }

    let next = match game.turns.register(id) {
        Ok(next) => next,
        Err(e) => {
            tracing::warn!(conn_id = %id, error = %e, "could not join the turn order");
            None
        }
    };
    game.broadcast_world();
    if let Some(directive) = next {
        game.prepare_turn(directive);
    }
}

fn on_data_request(game: &mut Game, _: &DataRequest, id: ConnectionId) {
    tracing::debug!(conn_id = %id, "world data requested");
    game.reply(id, &game.world.data_response());
}

fn on_turn_request(game: &mut Game, request: &TurnRequest, id: ConnectionId) {
    let Game {
        turns,
        world,
        resolver,
        ..
    } = game;
    let submitted = turns.submit_turn_action(&id, request, |actor, request| {
        resolver.resolve(world, *actor, request)
    });

    match submitted {
        Ok(accepted) => {
            game.reply(id, &accepted.outcome);
            if let Some(directive) = accepted.next {
                game.prepare_turn(directive);
            }
        }
        Err(e) => {
            tracing::debug!(conn_id = %id, error = %e, "turn rejected");
            game.reply(id, &TurnResult::rejected(e.to_string()));
        }
    }
}

fn on_end_turn(game: &mut Game, _: &EndTurn, id: ConnectionId) {
    match game.turns.end_turn(&id) {
        Ok(next) => {
            tracing::debug!(conn_id = %id, "turn ended");
            if let Some(directive) = next {
                game.prepare_turn(directive);
            }
        }
        Err(e) => {
            tracing::debug!(conn_id = %id, error = %e, "end of turn rejected");
            game.reply(id, &TurnResult::rejected(e.to_string()));
        }
    }
}

/// The server's handler table.
pub fn router() -> Router<Game, ConnectionId> {
    Router::new()
        .bind(on_client_connected)
        .bind(on_client_disconnected)
        .bind(on_introduction_request)
        .bind(on_introduction)
        .bind(on_actor_request)
        .bind(on_data_request)
        .bind(on_turn_request)
        .bind(on_end_turn)
}

// ---------------------------------------------------------------------------
// ServerApp
// ---------------------------------------------------------------------------

/// A bound server: game state plus the handlers that drive it.
///
/// # Example
///
/// ```rust,no_run
/// use cavern_server::{ServerApp, ServerConfig};
///
/// # async fn run() -> Result<(), cavern_server::ServerError> {
/// let app = ServerApp::bind(ServerConfig::default()).await?;
/// app.run().await;
/// # Ok(())
/// # }
/// ```
pub struct ServerApp {
    game: Game,
    router: Router<Game, ConnectionId>,
    config: ServerConfig,
}

impl ServerApp {
    /// Generates the world and starts listening.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let protocol = Arc::new(catalogue::protocol()?);
        let network = ServerNetwork::bind(&config.bind_addr, protocol).await?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let world = GridWorld::generate(config.width, config.height, &mut rng);

        tracing::info!(addr = %network.local_addr(), name = %config.name, "server listening");
        let game = Game {
            network,
            world,
            turns: TurnSequencer::with_policy(config.turn_policy),
            sensing: RangeSensing::new(config.senses),
            resolver: Box::new(LoggingResolver),
            rng,
            name: config.name.clone(),
        };

        Ok(Self {
            game,
            router: router(),
            config,
        })
    }

    /// Replaces the action resolver.
    pub fn with_resolver(mut self, resolver: impl ActionResolver) -> Self {
        self.game.resolver = Box::new(resolver);
        self
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    pub fn protocol(&self) -> &Arc<Protocol> {
        self.game.network.protocol()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.game.network.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Forces the turn on to the next actor and tells it so.
    ///
    /// Returns the new holder, or `None` when nobody is registered.
    pub fn advance_turn(&mut self) -> Option<ConnectionId> {
        let directive = self.game.turns.advance()?;
        let holder = *directive.actor();
        self.game.prepare_turn(directive);
        Some(holder)
    }

    /// One tick: drains the network and dispatches every event.
    pub fn update(&mut self) -> usize {
        let events = self.game.network.drain();
        let count = events.len();
        for (id, message) in events {
            self.router.call(&mut self.game, &*message, id);
        }
        count
    }

    /// Runs the tick loop forever.
    pub async fn run(mut self) {
        let mut interval = time::interval(self.config.tick_duration());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let handled = self.update();
            if handled > 0 {
                tracing::trace!(handled, "tick");
            }
        }
    }
}
