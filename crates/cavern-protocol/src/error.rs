//! Error types for the protocol layer.
//!
//! Two enums live here. [`ValidationError`] is raised while raw decoded
//! data is checked against a schema; it never escapes as a half-built
//! message. [`ProtocolError`] covers everything around the envelope: ids,
//! registration, and byte-level encoding.

use crate::MessageId;

/// A schema check failed.
///
/// Every variant names what was expected and what kind of value showed up
/// instead, so a log line is enough to find the offending peer's bug.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// A declared field was not present in the mapping.
    #[error("{schema}: missing field `{field}`")]
    MissingField {
        schema: &'static str,
        field: &'static str,
    },

    /// The value had the wrong shape (e.g. a string where an int was declared).
    #[error("expected {expected}, found {actual}")]
    TypeMismatch {
        expected: String,
        actual: &'static str,
    },

    /// No alternative of a `OneOf` accepted the value.
    #[error("expected one of [{}], found {actual}", attempted.join(", "))]
    NoMatchingChoice {
        attempted: Vec<String>,
        actual: &'static str,
    },

    /// The value is not one of the permitted literals.
    #[error("expected one of {expected}, found {actual}")]
    NotInEnum { expected: String, actual: String },

    /// The canonical data passed the schema but could not be turned into
    /// the Rust type bound to it.
    #[error("{schema}: {reason}")]
    Malformed {
        schema: &'static str,
        reason: String,
    },
}

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The envelope carried an id no message type was registered under.
    #[error("unknown message id {0}")]
    UnknownMessageId(MessageId),

    /// A message type was sent without being registered first.
    #[error("message type {0} is not registered")]
    Unregistered(&'static str),

    /// The same message type was registered twice.
    #[error("message type {0} registered twice")]
    DuplicateRegistration(&'static str),

    /// The payload did not satisfy the message schema.
    #[error("invalid payload: {0}")]
    Validation(#[from] ValidationError),

    /// Serialization failed (turning a value into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (malformed JSON or not an envelope).
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_names_the_field() {
        let err = ValidationError::MissingField {
            schema: "Introduction",
            field: "name",
        };
        assert_eq!(err.to_string(), "Introduction: missing field `name`");
    }

    #[test]
    fn test_no_matching_choice_lists_alternatives() {
        let err = ValidationError::NoMatchingChoice {
            attempted: vec!["int".into(), "str".into()],
            actual: "list",
        };
        assert_eq!(err.to_string(), "expected one of [int, str], found list");
    }

    #[test]
    fn test_validation_converts_into_protocol_error() {
        let err: ProtocolError = ValidationError::TypeMismatch {
            expected: "int".into(),
            actual: "str",
        }
        .into();
        assert!(matches!(err, ProtocolError::Validation(_)));
        assert!(err.to_string().contains("expected int"));
    }
}
