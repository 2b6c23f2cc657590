//! The message registry: a bijection between message types and small ids.
//!
//! Built once during startup with [`Registry::builder`], then shared
//! immutably (usually inside an `Arc<Protocol>`). Ids are dense and follow
//! registration order, so both peers must register the same types in the
//! same order.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{BoxedMessage, Message};
use crate::{ProtocolError, ValidationError};

/// The integer id a message type travels under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u32);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M-{}", self.0)
    }
}

type DecodeFn = fn(&Value) -> Result<BoxedMessage, ValidationError>;

fn decode_boxed<M: Message>(raw: &Value) -> Result<BoxedMessage, ValidationError> {
    let message = M::from_value(raw)?;
    Ok(Box::new(message))
}

struct Entry {
    name: &'static str,
    type_id: TypeId,
    decode: DecodeFn,
}

/// Collects registrations in order. Consumed by [`build`](Self::build).
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<Entry>,
    ids: HashMap<TypeId, MessageId>,
}

impl RegistryBuilder {
    /// Registers `M` under the next free id.
    ///
    /// # Errors
    /// [`ProtocolError::DuplicateRegistration`] if `M` is already registered.
    pub fn register<M: Message>(mut self) -> Result<Self, ProtocolError> {
        let type_id = TypeId::of::<M>();
        let name = M::schema().name;
        if self.ids.contains_key(&type_id) {
            return Err(ProtocolError::DuplicateRegistration(name));
        }

        let id = MessageId(self.entries.len() as u32);
        self.ids.insert(type_id, id);
        self.entries.push(Entry {
            name,
            type_id,
            decode: decode_boxed::<M>,
        });
        Ok(self)
    }

    /// Freezes the registry.
    pub fn build(self) -> Registry {
        for (i, entry) in self.entries.iter().enumerate() {
            tracing::debug!(id = i, message = entry.name, "registered message");
        }
        Registry {
            entries: self.entries,
            ids: self.ids,
        }
    }
}

/// Immutable message type ↔ id map.
pub struct Registry {
    entries: Vec<Entry>,
    ids: HashMap<TypeId, MessageId>,
}

impl Registry {
    /// Starts an empty registration list.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Returns the id `M` was registered under.
    ///
    /// # Errors
    /// [`ProtocolError::Unregistered`] if `M` was never registered.
    pub fn id_of<M: Message>(&self) -> Result<MessageId, ProtocolError> {
        self.ids
            .get(&TypeId::of::<M>())
            .copied()
            .ok_or(ProtocolError::Unregistered(M::schema().name))
    }

    /// Returns the `TypeId` registered under `id`.
    pub fn type_of(&self, id: MessageId) -> Option<TypeId> {
        self.entry(id).map(|e| e.type_id)
    }

    /// Returns the schema name registered under `id`.
    pub fn name_of(&self, id: MessageId) -> Option<&'static str> {
        self.entry(id).map(|e| e.name)
    }

    /// Validates `payload` against the type registered under `id` and
    /// returns the decoded message.
    pub fn decode(&self, id: MessageId, payload: &Value) -> Result<BoxedMessage, ProtocolError> {
        let entry = self.entry(id).ok_or(ProtocolError::UnknownMessageId(id))?;
        Ok((entry.decode)(payload)?)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(id, name)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (MessageId, &'static str)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (MessageId(i as u32), e.name))
    }

    fn entry(&self, id: MessageId) -> Option<&Entry> {
        self.entries.get(id.0 as usize)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
