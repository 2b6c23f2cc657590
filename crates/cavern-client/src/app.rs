//! Client state, handlers and tick loop.

use std::sync::Arc;

use cavern_net::{ClientNetwork, Connected, Disconnected, Router};
use cavern_protocol::Message;
use cavern_protocol::catalogue::{
    self, Actor, ActorKind, ActorRequest, ActorResponse, DataRequest, DataResponse, EndTurn,
    Introduction, IntroductionRequest, PrepareTurnRequest, TurnRequest, TurnResult,
};
use tokio::time::{self, MissedTickBehavior};

use crate::world::LocalWorld;
use crate::{ClientConfig, ClientError};

/// Everything the client handlers mutate.
#[derive(Debug)]
pub struct ClientState {
    pub network: ClientNetwork,
    pub world: LocalWorld,
    /// Our actor as last reported by the server.
    pub actor: Option<Actor>,
    /// Name the server introduced itself with.
    pub server_name: Option<String>,
    /// Accepted turns so far.
    pub turns_played: u32,
    pub last_result: Option<TurnResult>,
    /// Set between a `PrepareTurnRequest` and our `TurnRequest`.
    pub my_turn: bool,
    ever_connected: bool,
    disconnected: bool,
    config: ClientConfig,
}

impl ClientState {
    fn send<M: Message>(&self, message: &M) {
        if let Err(e) = self.network.send(message) {
            tracing::warn!(error = %e, "could not send");
        }
    }

    /// Submits the turn we hold, unless we are done playing.
    pub fn play_turn(&mut self) {
        if !self.my_turn {
            tracing::debug!("not holding the turn");
            return;
        }
        if self.played_enough() {
            return;
        }
        self.my_turn = false;
        self.send(&TurnRequest {});
    }

    /// Passes the turn on. The server rejects it unless we hold the turn.
    pub fn end_turn(&mut self) {
        self.my_turn = false;
        self.send(&EndTurn {});
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    fn played_enough(&self) -> bool {
        self.config
            .max_turns
            .is_some_and(|max| self.turns_played >= max)
    }
}

fn on_connected(state: &mut ClientState, _: &Connected, (): ()) {
    tracing::info!(url = %state.config.url, "connected to server");
    state.ever_connected = true;
    state.send(&Introduction {
        name: state.config.name.clone(),
    });
    state.send(&DataRequest {});
    state.send(&ActorRequest {
        kind: ActorKind::Caveman,
    });
}

fn on_disconnected(state: &mut ClientState, _: &Disconnected, (): ()) {
    tracing::info!(url = %state.config.url, "disconnected from server");
    state.disconnected = true;
    state.my_turn = false;
}

fn on_introduction_request(state: &mut ClientState, _: &IntroductionRequest, (): ()) {
    state.send(&Introduction {
        name: state.config.name.clone(),
    });
}

fn on_introduction(state: &mut ClientState, intro: &Introduction, (): ()) {
    tracing::info!(name = %intro.name, "server introduced itself");
    state.server_name = Some(intro.name.clone());
}

fn on_data_response(state: &mut ClientState, data: &DataResponse, (): ()) {
    tracing::debug!(width = data.width, height = data.height, "world data received");
    state.world.apply(data);
}

fn on_actor_response(state: &mut ClientState, response: &ActorResponse, (): ()) {
    if !response.success {
        tracing::warn!(actor = ?response.actor, "actor request refused");
        return;
    }
    tracing::info!(x = response.actor.x, y = response.actor.y, "actor spawned");
    state.actor = Some(response.actor.clone());
}

fn on_prepare_turn_request(state: &mut ClientState, request: &PrepareTurnRequest, (): ()) {
    let senses = &request.actor.senses;
    tracing::debug!(
        sight = senses.sight.len(),
        hearing = senses.hearing.len(),
        smell = senses.smell.len(),
        "our turn"
    );
    state.actor = Some(request.actor.clone());
    state.my_turn = true;
    if state.config.auto_play {
        state.play_turn();
    }
}

fn on_turn_result(state: &mut ClientState, result: &TurnResult, (): ()) {
    let accepted = result.success && result.error.is_none();
    if accepted {
        state.turns_played += 1;
        tracing::debug!(turns = state.turns_played, "turn accepted");
    } else {
        tracing::warn!(error = ?result.error, "turn rejected");
    }
    state.last_result = Some(result.clone());

    if state.played_enough() {
        tracing::info!(turns = state.turns_played, "played enough, leaving");
        state.my_turn = false;
        state.network.close();
    } else if accepted && state.config.end_turns {
        state.end_turn();
    }
}

/// The client's handler table.
pub fn router() -> Router<ClientState> {
    Router::new()
        .bind(on_connected)
        .bind(on_disconnected)
        .bind(on_introduction_request)
        .bind(on_introduction)
        .bind(on_data_response)
        .bind(on_actor_response)
        .bind(on_prepare_turn_request)
        .bind(on_turn_result)
}

/// A headless client: connects, spawns a caveman and plays its turns.
pub struct ClientApp {
    state: ClientState,
    router: Router<ClientState>,
}

impl ClientApp {
    /// Starts connecting. The outcome shows up on the next ticks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let protocol = Arc::new(catalogue::protocol()?);
        let network = ClientNetwork::connect(&config.url, protocol);
        let state = ClientState {
            network,
            world: LocalWorld::default(),
            actor: None,
            server_name: None,
            turns_played: 0,
            last_result: None,
            my_turn: false,
            ever_connected: false,
            disconnected: false,
            config,
        };
        Ok(Self {
            state,
            router: router(),
        })
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ClientState {
        &mut self.state
    }

    /// One tick: drains the network and dispatches every message.
    pub fn update(&mut self) -> usize {
        let messages = self.state.network.drain();
        let count = messages.len();
        for message in messages {
            self.router.call(&mut self.state, &*message, ());
        }
        count
    }

    /// Ticks until the connection ends.
    ///
    /// Fails with [`ClientError::Unreachable`] if the server was never
    /// reached.
    pub async fn run(mut self) -> Result<ClientState, ClientError> {
        let mut interval = time::interval(self.state.config.tick_duration());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !self.state.disconnected {
            interval.tick().await;
            self.update();
        }

        if self.state.ever_connected {
            Ok(self.state)
        } else {
            Err(ClientError::Unreachable(self.state.config.url.clone()))
        }
    }
}
