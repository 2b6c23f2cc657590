//! Envelopes, byte codecs, and the [`Protocol`] that ties them to a registry.
//!
//! Outbound: a typed message is *wrapped* into an [`Envelope`] carrying its
//! registry id and serialized payload, then *encoded* to bytes by a
//! [`Codec`]. Inbound runs the same steps backwards. Each step can fail on
//! its own (bad bytes, unknown id, schema violation) and reports a distinct
//! [`ProtocolError`] variant.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::model::{BoxedMessage, Message};
use crate::{MessageId, ProtocolError, Registry};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The wire unit: `{"id": <int>, "payload": <mapping>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Registry id of the payload's message type.
    pub id: MessageId,
    /// The message, serialized in field-declaration order.
    pub payload: Value,
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Turns serializable values into frames and back.
///
/// `Send + Sync + 'static` because one codec is shared by every reader and
/// writer task of a process.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that frames envelopes as JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

/// A frozen [`Registry`] plus the [`Codec`] used to put envelopes on the wire.
///
/// ```rust
/// use cavern_protocol::{Protocol, catalogue};
/// use cavern_protocol::catalogue::Introduction;
///
/// let protocol = Protocol::json(catalogue::registry().unwrap());
///
/// let bytes = protocol.encode(&Introduction { name: "grok".into() }).unwrap();
/// let decoded = protocol.decode(&bytes).unwrap();
/// assert_eq!(
///     decoded.downcast_ref::<Introduction>(),
///     Some(&Introduction { name: "grok".into() }),
/// );
/// ```
#[derive(Debug)]
pub struct Protocol<C: Codec = JsonCodec> {
    registry: Registry,
    codec: C,
}

impl Protocol<JsonCodec> {
    /// A protocol that frames envelopes as JSON.
    pub fn json(registry: Registry) -> Self {
        Self::new(registry, JsonCodec)
    }
}

impl<C: Codec> Protocol<C> {
    pub fn new(registry: Registry, codec: C) -> Self {
        Self { registry, codec }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Wraps a message into an envelope tagged with its registry id.
    pub fn wrap<M: Message>(&self, message: &M) -> Result<Envelope, ProtocolError> {
        Ok(Envelope {
            id: self.registry.id_of::<M>()?,
            payload: message.to_value()?,
        })
    }

    /// Reconstructs the typed message inside an envelope.
    ///
    /// # Errors
    /// - [`ProtocolError::UnknownMessageId`] if nothing is registered under the id
    /// - [`ProtocolError::Validation`] if the payload breaks the schema
    pub fn unwrap(&self, envelope: &Envelope) -> Result<BoxedMessage, ProtocolError> {
        self.registry.decode(envelope.id, &envelope.payload)
    }

    /// Wraps and encodes a message into a frame.
    pub fn encode<M: Message>(&self, message: &M) -> Result<Vec<u8>, ProtocolError> {
        self.codec.encode(&self.wrap(message)?)
    }

    /// Decodes and unwraps a frame into a typed message.
    pub fn decode(&self, data: &[u8]) -> Result<BoxedMessage, ProtocolError> {
        let envelope: Envelope = self.codec.decode(data)?;
        self.unwrap(&envelope)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::catalogue::{self, DataRequest, Introduction};

    fn protocol() -> Protocol {
        Protocol::json(catalogue::registry().unwrap())
    }

    #[test]
    fn test_wrap_produces_id_and_payload() {
        let protocol = protocol();
        let envelope = protocol.wrap(&Introduction { name: "foo".into() }).unwrap();
        let expected_id = protocol.registry().id_of::<Introduction>().unwrap();

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"id": expected_id.0, "payload": {"name": "foo"}})
        );
    }

    #[test]
    fn test_unwrap_unknown_id() {
        let envelope = Envelope {
            id: MessageId(999),
            payload: json!({}),
        };
        let err = protocol().unwrap(&envelope).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownMessageId(MessageId(999))));
    }

    #[test]
    fn test_unwrap_invalid_payload() {
        let protocol = protocol();
        let envelope = Envelope {
            id: protocol.registry().id_of::<Introduction>().unwrap(),
            payload: json!({"name": 42}),
        };
        let err = protocol.unwrap(&envelope).unwrap_err();
        assert!(matches!(err, ProtocolError::Validation(_)));
    }

    #[test]
    fn test_empty_message_wraps_to_empty_mapping() {
        let protocol = protocol();
        let envelope = protocol.wrap(&DataRequest {}).unwrap();
        assert_eq!(envelope.payload, json!({}));
    }

    #[test]
    fn test_decode_garbage_returns_error() {
        let err = protocol().decode(b"not json at all").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_decode_wrong_shape_returns_error() {
        let err = protocol().decode(br#"{"name": "hello"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_json_codec_round_trip() {
        let codec = JsonCodec;
        let envelope = Envelope {
            id: MessageId(4),
            payload: json!({"success": true, "error": null}),
        };
        let bytes = codec.encode(&envelope).unwrap();
        let decoded: Envelope = codec.decode(&bytes).unwrap();
        assert_eq!(envelope, decoded);
    }
}
