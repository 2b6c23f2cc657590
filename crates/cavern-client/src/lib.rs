//! # Cavern client
//!
//! A headless client for a Cavern server. On connect it introduces itself,
//! asks for the map and for a caveman, then keeps a local copy of the
//! world and plays every turn it is offered.

mod app;
mod config;
mod error;
pub mod world;

pub use app::{ClientApp, ClientState, router};
pub use config::ClientConfig;
pub use error::ClientError;
pub use world::LocalWorld;
