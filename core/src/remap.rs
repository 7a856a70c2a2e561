//! Remapper - Declarative Data Transformation
//!
//! A remapper is one of three shapes:
//!
//! * a literal (`null`, boolean, number, string) returned unchanged,
//! * a single-key operator object such as `{ "prop": "name" }`,
//! * an array, evaluated as a left-to-right pipeline.
//!
//! Parsing only checks the shape. Operator names are looked up at evaluation time,
//! so a definition that names an unknown operator still loads.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemapError {
    #[error("unknown remapper operator `{0}`")]
    UnknownOperator(String),

    #[error("malformed remapper: {0}")]
    Malformed(String),

    #[error("`{operator}` failed: {message}")]
    Operator { operator: String, message: String },
}

impl RemapError {
    pub fn operator(operator: &str, message: impl Into<String>) -> Self {
        RemapError::Operator {
            operator: operator.to_string(),
            message: message.into(),
        }
    }
}

/// A parsed, immutable remapper tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Remapper {
    Literal(Value),
    /// Operator arguments stay raw JSON; each operator decides which parts are
    /// themselves remappers.
    Operator { name: String, args: Value },
    Pipeline(Vec<Remapper>),
}

impl Remapper {
    pub fn parse(value: &Value) -> Result<Self, RemapError> {
        match value {
            Value::Array(steps) => steps
                .iter()
                .map(Remapper::parse)
                .collect::<Result<Vec<_>, _>>()
                .map(Remapper::Pipeline),
            Value::Object(map) => {
                let mut entries = map.iter();
                match (entries.next(), entries.next()) {
                    (Some((name, args)), None) => Ok(Remapper::Operator {
                        name: name.clone(),
                        args: args.clone(),
                    }),
                    _ => Err(RemapError::Malformed(format!(
                        "operator objects must have exactly one key, found {}",
                        map.len()
                    ))),
                }
            }
            literal => Ok(Remapper::Literal(literal.clone())),
        }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Remapper::Literal(value.into())
    }

    pub fn operator(name: impl Into<String>, args: impl Into<Value>) -> Self {
        Remapper::Operator {
            name: name.into(),
            args: args.into(),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Remapper::Literal(_))
    }

    /// Back to the JSON form it was parsed from.
    pub fn to_value(&self) -> Value {
        match self {
            Remapper::Literal(value) => value.clone(),
            Remapper::Operator { name, args } => {
                let mut map = Map::new();
                map.insert(name.clone(), args.clone());
                Value::Object(map)
            }
            Remapper::Pipeline(steps) => Value::Array(steps.iter().map(Remapper::to_value).collect()),
        }
    }
}

impl TryFrom<Value> for Remapper {
    type Error = RemapError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Remapper::parse(&value)
    }
}

impl Serialize for Remapper {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Remapper {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Remapper::parse(&value).map_err(serde::de::Error::custom)
    }
}
