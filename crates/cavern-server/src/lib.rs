//! # Cavern server
//!
//! The authoritative side of a Cavern game. It owns the world grid, the
//! turn order and every actor, and drives them from a single tick loop:
//!
//! ```text
//! sockets ──▶ ServerNetwork::drain ──▶ Router ──▶ handlers ──▶ Game
//!                                                  │
//!                     send_to / broadcast ◀────────┘
//! ```
//!
//! Handlers never block. Game state is touched only from the tick loop.

mod app;
mod config;
mod error;
pub mod resolver;
pub mod sensing;
pub mod world;

pub use app::{Game, PeerSession, ServerApp, router};
pub use cavern_turn::TurnPolicy;
pub use config::ServerConfig;
pub use error::ServerError;
pub use resolver::{ActionResolver, LoggingResolver};
pub use sensing::{RangeSensing, Sense, SenseRanges, WorldPerception};
pub use world::{Cell, GridWorld, Item, Occupant, WorldError};
