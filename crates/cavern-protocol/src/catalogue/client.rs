//! Peer introductions.

use serde::{Deserialize, Serialize};

use crate::schema::{Field, MessageSchema, Primitive, Validator};

static INTRODUCTION_REQUEST: MessageSchema = MessageSchema {
    name: "IntroductionRequest",
    fields: &[],
};

static INTRODUCTION: MessageSchema = MessageSchema {
    name: "Introduction",
    fields: &[Field { name: "name", validator: Validator::Typed(Primitive::Str) }],
};

/// Asks the peer to introduce itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntroductionRequest {}

message!(IntroductionRequest => INTRODUCTION_REQUEST);

/// A peer's display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Introduction {
    pub name: String,
}

message!(Introduction => INTRODUCTION);
