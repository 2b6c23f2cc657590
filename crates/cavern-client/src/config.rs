//! Client configuration.

use std::time::Duration;

/// Settings for a [`ClientApp`](crate::ClientApp).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL of the server.
    pub url: String,
    /// Name sent in the client's `Introduction`.
    pub name: String,
    /// Ticks per second. Clamped to `1..=MAX_TICK_RATE_HZ`.
    pub tick_rate_hz: u32,
    /// Submit a turn as soon as one is offered.
    pub auto_play: bool,
    /// Disconnect after this many accepted turns.
    pub max_turns: Option<u32>,
    /// Send `EndTurn` after every accepted turn. Needed against servers
    /// that keep the turn with its holder.
    pub end_turns: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8765".to_string(),
            name: "caveman".to_string(),
            tick_rate_hz: 30,
            auto_play: true,
            max_turns: None,
            end_turns: false,
        }
    }
}

impl ClientConfig {
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    pub fn url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn tick_rate(mut self, hz: u32) -> Self {
        self.tick_rate_hz = hz;
        self
    }

    pub fn auto_play(mut self, enabled: bool) -> Self {
        self.auto_play = enabled;
        self
    }

    pub fn max_turns(mut self, turns: u32) -> Self {
        self.max_turns = Some(turns);
        self
    }

    pub fn end_turns(mut self, enabled: bool) -> Self {
        self.end_turns = enabled;
        self
    }

    pub fn tick_duration(&self) -> Duration {
        let hz = self.tick_rate_hz.clamp(1, Self::MAX_TICK_RATE_HZ);
        Duration::from_secs_f64(1.0 / f64::from(hz))
    }
}
