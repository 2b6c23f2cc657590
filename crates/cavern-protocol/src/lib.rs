//! Wire protocol for Cavern.
//!
//! This crate defines what clients and servers say to each other and how
//! it is checked:
//!
//! - **Schemas** ([`schema`]): static tables of fields and validators that
//!   turn raw decoded JSON into canonical values or fail loudly.
//! - **Models** ([`Model`], [`Message`]): serde structs bound to a schema.
//!   A message value in hand is always a valid message.
//! - **Registry** ([`Registry`]): the bijection between message types and
//!   the integer ids they travel under.
//! - **Codec** ([`Protocol`], [`Codec`], [`JsonCodec`]): envelopes and bytes.
//! - **Catalogue** ([`catalogue`]): the cave-world messages.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the game
//! loop. It knows nothing about connections or turns.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope → typed Message) → Router
//! ```

pub mod catalogue;
mod codec;
mod error;
mod model;
mod registry;
pub mod schema;

pub use codec::{Codec, Envelope, JsonCodec, Protocol};
pub use error::{ProtocolError, ValidationError};
pub use model::{BoxedMessage, DynMessage, Message, Model};
pub use registry::{MessageId, Registry, RegistryBuilder};
