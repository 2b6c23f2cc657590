//! Composable validators and static schema tables.
//!
//! A [`MessageSchema`] is a named, ordered list of fields, each paired with
//! a [`Validator`]. Schemas are plain `'static` data: they are declared once
//! per message type as a `static` and shared by every instance. Validators
//! only ever borrow other `'static` data, so a whole schema tree can be
//! built without allocation or lazy initialization.
//!
//! Validation turns raw decoded JSON into a *canonical* value:
//!
//! - declared fields only (extra keys are dropped),
//! - in declaration order,
//! - every nested schema and list element checked recursively.
//!
//! There is no implicit coercion. An integer does not satisfy `Float`,
//! a boolean does not satisfy `Int`.

use std::fmt;

use serde_json::{Map, Value};

use crate::ValidationError;

// ---------------------------------------------------------------------------
// Primitive kinds
// ---------------------------------------------------------------------------

/// The primitive kinds a [`Validator::Typed`] can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Bool,
    Int,
    Float,
    Str,
}

impl Primitive {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Bool => value.is_boolean(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Float => value.is_f64(),
            Self::Str => value.is_string(),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Str => write!(f, "str"),
        }
    }
}

/// Returns the kind name of a raw value, as used in error messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

// ---------------------------------------------------------------------------
// Literal
// ---------------------------------------------------------------------------

/// A permitted value of a [`Validator::EnumValue`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Str(&'static str),
    Int(i64),
    Bool(bool),
}

impl Literal {
    fn matches(&self, value: &Value) -> bool {
        match *self {
            Self::Str(s) => value.as_str() == Some(s),
            Self::Int(i) => value.as_i64() == Some(i),
            Self::Bool(b) => value.as_bool() == Some(b),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// A rule that turns raw decoded data into a canonical value, or fails.
///
/// `OneOf` tries its alternatives in declared order and the first success
/// wins. `Option` lets `null` through untouched (and lets a field be absent
/// from its mapping altogether).
#[derive(Debug, Clone, Copy)]
pub enum Validator {
    /// Accepts anything unchanged.
    Any,
    /// A single primitive value of the given kind.
    Typed(Primitive),
    /// A mapping checked against a nested schema.
    Nested(&'static MessageSchema),
    /// A sequence whose every element satisfies the inner validator.
    ListOf(&'static Validator),
    /// `null`, or a value satisfying the inner validator.
    Option(&'static Validator),
    /// The first alternative that accepts the value.
    OneOf(&'static [Validator]),
    /// Exactly one of the listed literals.
    EnumValue(&'static [Literal]),
}

impl Validator {
    /// Validates `value`, returning its canonical form.
    pub fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        match *self {
            Self::Any => Ok(value.clone()),

            Self::Typed(primitive) => {
                if primitive.accepts(value) {
                    Ok(value.clone())
                } else {
                    Err(self.mismatch(value))
                }
            }

            Self::Nested(schema) => schema.validate(value),

            Self::ListOf(inner) => {
                let items = value.as_array().ok_or_else(|| self.mismatch(value))?;
                // `collect` into a Result stops at the first failure, so a
                // bad element never leaves a partially validated list behind.
                items
                    .iter()
                    .map(|item| inner.validate(item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }

            Self::Option(inner) => {
                if value.is_null() {
                    Ok(Value::Null)
                } else {
                    inner.validate(value)
                }
            }

            Self::OneOf(choices) => {
                for choice in choices {
                    if let Ok(canonical) = choice.validate(value) {
                        return Ok(canonical);
                    }
                }
                Err(ValidationError::NoMatchingChoice {
                    attempted: choices.iter().map(ToString::to_string).collect(),
                    actual: kind_of(value),
                })
            }

            Self::EnumValue(literals) => {
                if literals.iter().any(|lit| lit.matches(value)) {
                    Ok(value.clone())
                } else {
                    Err(ValidationError::NotInEnum {
                        expected: self.to_string(),
                        actual: value.to_string(),
                    })
                }
            }
        }
    }

    /// Whether a field declared with this validator may be missing.
    pub fn allows_absence(&self) -> bool {
        matches!(self, Self::Option(_))
    }

    fn mismatch(&self, value: &Value) -> ValidationError {
        ValidationError::TypeMismatch {
            expected: self.to_string(),
            actual: kind_of(value),
        }
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Typed(primitive) => write!(f, "{primitive}"),
            Self::Nested(schema) => write!(f, "{}", schema.name),
            Self::ListOf(inner) => write!(f, "list<{inner}>"),
            Self::Option(inner) => write!(f, "option<{inner}>"),
            Self::OneOf(choices) => {
                write!(f, "one_of(")?;
                for (i, choice) in choices.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{choice}")?;
                }
                write!(f, ")")
            }
            Self::EnumValue(literals) => {
                write!(f, "enum(")?;
                for (i, lit) in literals.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{lit}")?;
                }
                write!(f, ")")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MessageSchema
// ---------------------------------------------------------------------------

/// One declared field of a schema.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub validator: Validator,
}

/// An ordered, immutable table of fields shared by all instances of a type.
///
/// ```rust
/// use cavern_protocol::schema::{Field, MessageSchema, Primitive, Validator};
/// use serde_json::json;
///
/// static POINT: MessageSchema = MessageSchema {
///     name: "Point",
///     fields: &[
///         Field { name: "x", validator: Validator::Typed(Primitive::Int) },
///         Field { name: "y", validator: Validator::Typed(Primitive::Int) },
///     ],
/// };
///
/// let canonical = POINT.validate(&json!({"y": 2, "x": 1, "z": 3})).unwrap();
/// assert_eq!(canonical.to_string(), r#"{"x":1,"y":2}"#);
/// ```
#[derive(Debug)]
pub struct MessageSchema {
    pub name: &'static str,
    pub fields: &'static [Field],
}

impl MessageSchema {
    /// Validates a raw mapping, returning the canonical mapping.
    ///
    /// Fails with [`ValidationError::MissingField`] on the first declared
    /// field that is absent (unless it is an `Option`), or with the first
    /// field-level error.
    pub fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        let mapping = value
            .as_object()
            .ok_or_else(|| ValidationError::TypeMismatch {
                expected: self.name.to_string(),
                actual: kind_of(value),
            })?;

        let mut canonical = Map::with_capacity(self.fields.len());
        for field in self.fields {
            let resolved = match mapping.get(field.name) {
                Some(raw) => field.validator.validate(raw)?,
                None if field.validator.allows_absence() => Value::Null,
                None => {
                    return Err(ValidationError::MissingField {
                        schema: self.name,
                        field: field.name,
                    });
                }
            };
            canonical.insert(field.name.to_string(), resolved);
        }
        Ok(Value::Object(canonical))
    }

    /// Iterates over the declared field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> {
        self.fields.iter().map(|f| f.name)
    }
}
