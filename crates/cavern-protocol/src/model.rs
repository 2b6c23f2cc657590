//! Typed models bound to schemas, and type-erased messages.
//!
//! A [`Model`] is a serde struct paired with the `'static` schema that
//! governs its wire form. Building one from raw data always goes through
//! the schema first, so a model value in hand is a valid model value.
//! Building one from Rust values is checked by the type system instead:
//! enum-constrained fields are Rust enums, optional fields are `Option`.
//!
//! A [`Message`] is a model that may travel on its own inside an envelope
//! and therefore can be registered in a [`Registry`](crate::Registry).

use std::any::Any;
use std::fmt;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::schema::MessageSchema;
use crate::{ProtocolError, ValidationError};

/// A struct whose wire representation is governed by a [`MessageSchema`].
pub trait Model: Serialize + DeserializeOwned + fmt::Debug + Send + 'static {
    /// The schema shared by every instance of this type.
    fn schema() -> &'static MessageSchema;

    /// Constructs an instance from raw decoded data.
    ///
    /// Validation is eager and all-or-nothing: either every field checks
    /// out and a complete value is returned, or nothing is.
    fn from_value(raw: &Value) -> Result<Self, ValidationError> {
        let schema = Self::schema();
        let canonical = schema.validate(raw)?;
        serde_json::from_value(canonical).map_err(|e| ValidationError::Malformed {
            schema: schema.name,
            reason: e.to_string(),
        })
    }

    /// Serializes to a mapping in field-declaration order.
    fn to_value(&self) -> Result<Value, ProtocolError> {
        serde_json::to_value(self).map_err(ProtocolError::Encode)
    }
}

/// A model that can be registered and sent as a top-level message.
pub trait Message: Model {}

// ---------------------------------------------------------------------------
// Type erasure
// ---------------------------------------------------------------------------

/// Object-safe view of anything that can flow through an inbound queue.
///
/// Decoded messages and the transport's lifecycle events (connected,
/// disconnected) share this trait so one router can dispatch both.
pub trait DynMessage: Any + Send + fmt::Debug {
    /// Upcasts to `Any` for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Short type name, for logging.
    fn type_name(&self) -> &'static str;
}

impl<T: Any + Send + fmt::Debug> DynMessage for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        let full = std::any::type_name::<T>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

impl dyn DynMessage {
    /// Returns the concrete message if it is of type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Whether the message is of type `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// An owned, type-erased message.
///
/// `Box<dyn DynMessage>` itself satisfies `DynMessage`, so call methods on
/// the contents (`&*boxed`), not on the box.
pub type BoxedMessage = Box<dyn DynMessage>;
