//! Server configuration.

use std::time::Duration;

use cavern_turn::TurnPolicy;

use crate::sensing::SenseRanges;

/// Everything needed to start a [`ServerApp`](crate::ServerApp).
///
/// Fields are public; the setters exist for chaining.
///
/// ```rust
/// use cavern_server::ServerConfig;
///
/// let config = ServerConfig::default()
///     .bind("0.0.0.0:9000")
///     .world_size(16, 8)
///     .tick_rate(20);
/// assert_eq!(config.width, 16);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// World width in tiles.
    pub width: u32,
    /// World height in tiles.
    pub height: u32,
    /// Ticks per second. Clamped to `1..=MAX_TICK_RATE_HZ`.
    pub tick_rate_hz: u32,
    /// Whether an accepted turn passes the turn on.
    pub turn_policy: TurnPolicy,
    /// Reach of each sense, in tiles.
    pub senses: SenseRanges,
    /// Name sent in answer to an `IntroductionRequest`.
    pub name: String,
    /// Seed for world generation and spawn points. Random when `None`.
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8765".to_string(),
            width: 32,
            height: 32,
            tick_rate_hz: 30,
            turn_policy: TurnPolicy::default(),
            senses: SenseRanges::default(),
            name: "cavern".to_string(),
            seed: None,
        }
    }
}

impl ServerConfig {
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn world_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn tick_rate(mut self, hz: u32) -> Self {
        self.tick_rate_hz = hz;
        self
    }

    pub fn turn_policy(mut self, policy: TurnPolicy) -> Self {
        self.turn_policy = policy;
        self
    }

    pub fn senses(mut self, senses: SenseRanges) -> Self {
        self.senses = senses;
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Duration of one tick after clamping the rate.
    pub fn tick_duration(&self) -> Duration {
        let hz = self.tick_rate_hz.clamp(1, Self::MAX_TICK_RATE_HZ);
        if hz != self.tick_rate_hz {
            tracing::warn!(rate = self.tick_rate_hz, clamped = hz, "tick rate out of range");
        }
        Duration::from_secs_f64(1.0 / f64::from(hz))
    }
}
