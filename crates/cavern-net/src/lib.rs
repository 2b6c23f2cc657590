//! The bridge between concurrent socket I/O and the synchronous tick loop.
//!
//! Every connection runs two tokio tasks: a reader that decodes frames into
//! typed messages and pushes them onto an inbound queue, and a writer that
//! pops encoded frames off the connection's outbound queue. The tick loop
//! never awaits anything. Once per tick it calls `drain()`, which takes only
//! what was queued at that moment, and hands each message to a [`Router`].
//!
//! ```text
//!           ┌──────── reader task ──► inbound queue ──┐
//! socket ───┤                                         ├──► drain() ──► Router
//!           └──◄──── writer task ◄── outbound queue ◄─┘        (tick loop)
//! ```
//!
//! Queues are unbounded. There is no backpressure.

mod client;
mod dispatch;
mod error;
mod event;
mod id;
mod io;
mod server;

pub use client::ClientNetwork;
pub use dispatch::Router;
pub use error::NetError;
pub use event::{ClientConnected, ClientDisconnected, Connected, Disconnected};
pub use id::{ConnectionId, SlotAllocator};
pub use server::{Peer, ServerNetwork};
