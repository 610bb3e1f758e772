//! Runtime value model for constants.
//!
//! Constants in wire form carry plain JSON values. Two extra variants exist
//! only inside the engine: `Undefined` (result of a broken optional chain)
//! and `EntityType` (a reference to a domain constructor, the fold-time
//! stand-in for a captured constructor function).

use std::fmt;

use indexmap::IndexMap;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::types::{EntityRef, Scalar, Type};

/// A constant value carried by the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object {
        /// Nominal class when the object was built by a domain constructor.
        class: Option<EntityRef>,
        fields: IndexMap<String, Value>,
    },
    /// Reference to a domain type itself, e.g. the argument of `table(Order)`.
    EntityType(EntityRef),
}

impl Value {
    pub fn object(fields: IndexMap<String, Value>) -> Value {
        Value::Object {
            class: None,
            fields,
        }
    }

    pub fn instance(class: EntityRef, fields: IndexMap<String, Value>) -> Value {
        Value::Object {
            class: Some(class),
            fields,
        }
    }

    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Truthiness under the host-language rules: `false`, `0`, `NaN`, the
    /// empty string, `null` and `undefined` are falsy, everything else truthy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object { .. } | Value::EntityType(_) => true,
        }
    }

    /// Type inferred from the value's shape. Used when a constant is built
    /// without an explicit type.
    pub fn type_of(&self) -> Type {
        match self {
            Value::Undefined | Value::Null => Type::Literal(Scalar::Null),
            Value::Bool(_) => Type::Literal(Scalar::Bool),
            Value::Number(_) => Type::Literal(Scalar::Number),
            Value::String(_) => Type::Literal(Scalar::String),
            Value::Array(items) => {
                let element = items.first().map(Value::type_of).unwrap_or(Type::NULL);
                Type::array(element)
            }
            Value::Object {
                class: Some(class), ..
            } => Type::Named(class.clone()),
            Value::Object { class: None, fields } => Type::object(
                fields
                    .iter()
                    .map(|(name, v)| (name.clone(), v.type_of()))
                    .collect(),
            ),
            Value::EntityType(e) => Type::Function {
                callable: Some(e.clone()),
                ret: std::sync::Arc::new(Type::Named(e.clone())),
            },
        }
    }

    /// Field lookup, mirroring member access on a plain runtime object.
    /// Missing fields are `Undefined`, not an error.
    pub fn field(&self, name: &str) -> Value {
        match self {
            Value::Object { fields, .. } => fields.get(name).cloned().unwrap_or(Value::Undefined),
            Value::Array(items) if name == "length" => Value::Number(items.len() as f64),
            _ => Value::Undefined,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object { fields, .. } => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(name, v)| (name.clone(), v.to_json()))
                    .collect(),
            ),
            Value::EntityType(e) => {
                serde_json::json!({ "$entity": e.name() })
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object {
                class: None,
                fields: map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            },
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(serde_json::Value::deserialize(deserializer)?.into())
    }
}

/// Render a number the way the host language prints it: integral values
/// without a fractional part.
pub(crate) fn format_number(n: f64, out: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_finite() && n.trunc() == n && n.abs() < 1e15 {
        write!(out, "{}", n as i64)
    } else {
        write!(out, "{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => format_number(*n, f),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Object { class, fields } => {
                if let Some(class) = class {
                    write!(f, "{class} ")?;
                }
                f.write_str("{")?;
                for (i, (name, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {v}")?;
                }
                f.write_str("}")
            }
            Value::EntityType(e) => write!(f, "{e}"),
        }
    }
}
