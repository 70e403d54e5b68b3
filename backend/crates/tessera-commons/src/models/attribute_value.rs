//! Tagged attribute values as the backing table service stores them.
//!
//! Serializes to the service's JSON shape, e.g. `{"S": "abc"}`, `{"N": "42"}`,
//! `{"L": [...]}`, `{"M": {...}}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A persisted row: wire attribute name to tagged value.
pub type Item = BTreeMap<String, AttributeValue>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String tag.
    #[serde(rename = "S")]
    String(String),
    /// Number tag. Always decimal text so large integer amounts keep full precision.
    #[serde(rename = "N")]
    Number(String),
    /// Ordered list of tagged values.
    #[serde(rename = "L")]
    List(Vec<AttributeValue>),
    /// Nested attribute set.
    #[serde(rename = "M")]
    Map(Item),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
}

impl AttributeValue {
    /// Short tag name used in error messages.
    pub fn tag(&self) -> &'static str {
        match self {
            AttributeValue::String(_) => "S",
            AttributeValue::Number(_) => "N",
            AttributeValue::List(_) => "L",
            AttributeValue::Map(_) => "M",
            AttributeValue::Bool(_) => "BOOL",
            AttributeValue::Null(_) => "NULL",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&str> {
        match self {
            AttributeValue::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Item> {
        match self {
            AttributeValue::Map(item) => Some(item),
            _ => None,
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        AttributeValue::String(value.into())
    }

    pub fn number(value: impl ToString) -> Self {
        AttributeValue::Number(value.to_string())
    }
}
