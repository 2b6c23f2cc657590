//! The cave-world message catalogue.
//!
//! Messages are grouped by concern: [`actor`] (spawning and turns),
//! [`client`] (introductions) and [`world`] (map data). Every peer must
//! build its registry with [`registry`] so ids agree on both ends.

/// Binds a model type to its static schema.
macro_rules! model {
    ($ty:ty => $schema:expr) => {
        impl $crate::Model for $ty {
            fn schema() -> &'static $crate::schema::MessageSchema {
                &$schema
            }
        }
    };
}

/// Binds a model type to its static schema and marks it registrable.
macro_rules! message {
    ($ty:ty => $schema:expr) => {
        $crate::catalogue::model!($ty => $schema);
        impl $crate::Message for $ty {}
    };
}

pub(crate) use {message, model};

pub mod actor;
pub mod client;
pub mod world;

pub use actor::{
    Actor, ActorKind, ActorRequest, ActorResponse, Condition, EndTurn, PrepareTurnRequest,
    Sensation, Senses, TurnRequest, TurnResult,
};
pub use client::{Introduction, IntroductionRequest};
pub use world::{DataRequest, DataResponse, Object, Tile};

use crate::{Protocol, ProtocolError, Registry};

/// Builds the catalogue registry.
///
/// The order is part of the wire format: ids are assigned by position.
pub fn registry() -> Result<Registry, ProtocolError> {
    Ok(Registry::builder()
        // Actor
        .register::<ActorRequest>()?
        .register::<ActorResponse>()?
        .register::<PrepareTurnRequest>()?
        .register::<TurnRequest>()?
        .register::<TurnResult>()?
        // Client
        .register::<IntroductionRequest>()?
        .register::<Introduction>()?
        // World
        .register::<DataResponse>()?
        .register::<DataRequest>()?
        // Turn control, appended so earlier ids stay put
        .register::<EndTurn>()?
        .build())
}

/// A JSON [`Protocol`] over the catalogue registry.
pub fn protocol() -> Result<Protocol, ProtocolError> {
    Ok(Protocol::json(registry()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageId;

    #[test]
    fn test_catalogue_ids_are_fixed() {
        let reg = registry().unwrap();
        let names: Vec<_> = reg.iter().collect();
        assert_eq!(
            names,
            vec![
                (MessageId(0), "ActorRequest"),
                (MessageId(1), "ActorResponse"),
                (MessageId(2), "PrepareTurnRequest"),
                (MessageId(3), "TurnRequest"),
                (MessageId(4), "TurnResult"),
                (MessageId(5), "IntroductionRequest"),
                (MessageId(6), "Introduction"),
                (MessageId(7), "DataResponse"),
                (MessageId(8), "DataRequest"),
                (MessageId(9), "EndTurn"),
            ]
        );
    }
}
