//! Actor messages: spawning, perception and turns.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::{Field, Literal, MessageSchema, Primitive, Validator};

// ---------------------------------------------------------------------------
// Schemas
// ---------------------------------------------------------------------------

const FLOAT: Validator = Validator::Typed(Primitive::Float);
const INT: Validator = Validator::Typed(Primitive::Int);

static CONDITION: MessageSchema = MessageSchema {
    name: "Condition",
    fields: &[
        Field { name: "hunger", validator: FLOAT },
        Field { name: "thirst", validator: FLOAT },
        Field { name: "temperature", validator: FLOAT },
        Field { name: "health", validator: FLOAT },
    ],
};

static SENSATION: MessageSchema = MessageSchema {
    name: "Sensation",
    fields: &[
        Field {
            name: "traits",
            validator: Validator::ListOf(&Validator::Typed(Primitive::Str)),
        },
        Field { name: "x", validator: INT },
        Field { name: "y", validator: INT },
    ],
};

static SENSATION_ITEM: Validator = Validator::Nested(&SENSATION);

static SENSES: MessageSchema = MessageSchema {
    name: "Senses",
    fields: &[
        Field { name: "sight", validator: Validator::ListOf(&SENSATION_ITEM) },
        Field { name: "hearing", validator: Validator::ListOf(&SENSATION_ITEM) },
        Field { name: "smell", validator: Validator::ListOf(&SENSATION_ITEM) },
    ],
};

static ACTOR: MessageSchema = MessageSchema {
    name: "Actor",
    fields: &[
        Field { name: "type", validator: Validator::Typed(Primitive::Str) },
        Field { name: "x", validator: INT },
        Field { name: "y", validator: INT },
        Field { name: "senses", validator: Validator::Nested(&SENSES) },
        Field { name: "condition", validator: Validator::Nested(&CONDITION) },
    ],
};

static ACTOR_REQUEST: MessageSchema = MessageSchema {
    name: "ActorRequest",
    fields: &[Field {
        name: "type",
        validator: Validator::EnumValue(&[Literal::Str("caveman")]),
    }],
};

static ACTOR_RESPONSE: MessageSchema = MessageSchema {
    name: "ActorResponse",
    fields: &[
        Field { name: "success", validator: Validator::Typed(Primitive::Bool) },
        Field { name: "actor", validator: Validator::Nested(&ACTOR) },
    ],
};

static PREPARE_TURN_REQUEST: MessageSchema = MessageSchema {
    name: "PrepareTurnRequest",
    fields: &[Field { name: "actor", validator: Validator::Nested(&ACTOR) }],
};

static TURN_REQUEST: MessageSchema = MessageSchema { name: "TurnRequest", fields: &[] };

static END_TURN: MessageSchema = MessageSchema { name: "EndTurn", fields: &[] };

static TURN_RESULT: MessageSchema = MessageSchema {
    name: "TurnResult",
    fields: &[
        Field { name: "success", validator: Validator::Typed(Primitive::Bool) },
        Field {
            name: "error",
            validator: Validator::Option(&Validator::Typed(Primitive::Str)),
        },
    ],
};

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// Bodily state of an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub hunger: f64,
    pub thirst: f64,
    pub temperature: f64,
    pub health: f64,
}

impl Default for Condition {
    /// A freshly spawned actor: fed, watered, comfortable and at full health.
    fn default() -> Self {
        Self {
            hunger: 0.0,
            thirst: 0.0,
            temperature: 0.0,
            health: 100.0,
        }
    }
}

model!(Condition => CONDITION);

/// Something perceived at a tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensation {
    pub traits: Vec<String>,
    pub x: i32,
    pub y: i32,
}

model!(Sensation => SENSATION);

/// Everything an actor perceives, per sense.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Senses {
    pub sight: Vec<Sensation>,
    pub hearing: Vec<Sensation>,
    pub smell: Vec<Sensation>,
}

model!(Senses => SENSES);

/// An actor as seen by its controlling client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    #[serde(rename = "type")]
    pub kind: String,
    pub x: i32,
    pub y: i32,
    pub senses: Senses,
    pub condition: Condition,
}

model!(Actor => ACTOR);

/// The kinds of actor a client may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
    Caveman,
}

impl ActorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Caveman => "caveman",
        }
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Client → server: spawn an actor for me.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRequest {
    #[serde(rename = "type")]
    pub kind: ActorKind,
}

message!(ActorRequest => ACTOR_REQUEST);

/// Server → client: the spawned actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorResponse {
    pub success: bool,
    pub actor: Actor,
}

message!(ActorResponse => ACTOR_RESPONSE);

/// Server → client: it is your turn; here is what your actor perceives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepareTurnRequest {
    pub actor: Actor,
}

message!(PrepareTurnRequest => PREPARE_TURN_REQUEST);

/// Client → server: submit my turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnRequest {}

message!(TurnRequest => TURN_REQUEST);

/// Client → server: I am done, pass the turn on.
///
/// Only the holder may send it. A server that does not advance on its own
/// relies on this to move play along.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndTurn {}

message!(EndTurn => END_TURN);

/// Server → client: outcome of a [`TurnRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    pub success: bool,
    pub error: Option<String>,
}

impl TurnResult {
    pub fn accepted() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(reason.into()),
        }
    }
}

message!(TurnResult => TURN_RESULT);
