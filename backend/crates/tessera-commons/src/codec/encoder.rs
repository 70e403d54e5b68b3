use std::collections::BTreeMap;

use crate::codec::{LogicalValue, NameMap};
use crate::errors::CodecError;
use crate::models::{AttributeValue, Item};

/// Encode a single logical field into its wire name and tagged value.
pub fn encode_field(
    names: &NameMap,
    long_name: &str,
    value: &LogicalValue,
) -> Result<(&'static str, AttributeValue), CodecError> {
    let short = names.require_short(long_name)?;
    Ok((short, encode_value(names, value)?))
}

/// Encode a value. Nested maps have their long names compacted too.
pub fn encode_value(names: &NameMap, value: &LogicalValue) -> Result<AttributeValue, CodecError> {
    Ok(match value {
        LogicalValue::String(s) => AttributeValue::String(s.clone()),
        LogicalValue::Number(n) => AttributeValue::Number(n.as_str().to_string()),
        LogicalValue::Bool(b) => AttributeValue::Bool(*b),
        LogicalValue::List(values) => AttributeValue::List(
            values
                .iter()
                .map(|v| encode_value(names, v))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        LogicalValue::Map(fields) => AttributeValue::Map(encode_map(names, fields)?),
    })
}

fn encode_map(
    names: &NameMap,
    fields: &BTreeMap<String, LogicalValue>,
) -> Result<Item, CodecError> {
    let mut item = Item::new();
    for (long_name, value) in fields {
        let (short, encoded) = encode_field(names, long_name, value)?;
        item.insert(short.to_string(), encoded);
    }
    Ok(item)
}

/// Incremental builder for one persisted item.
///
/// Unknown long names are rejected rather than dropped, so a typo in a model
/// surfaces at the first write instead of silently losing data.
pub struct RecordEncoder<'a> {
    names: &'a NameMap,
    item: Item,
}

impl<'a> RecordEncoder<'a> {
    pub fn new(names: &'a NameMap) -> Self {
        Self {
            names,
            item: Item::new(),
        }
    }

    /// Primary-key field: stored lower-cased.
    pub fn key(&mut self, long_name: &str, value: &str) -> Result<&mut Self, CodecError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CodecError::MissingField(long_name.to_string()));
        }
        let short = self.names.require_short(long_name)?;
        self.item
            .insert(short.to_string(), AttributeValue::String(trimmed.to_lowercase()));
        Ok(self)
    }

    pub fn field(
        &mut self,
        long_name: &str,
        value: impl Into<LogicalValue>,
    ) -> Result<&mut Self, CodecError> {
        let (short, encoded) = encode_field(self.names, long_name, &value.into())?;
        self.item.insert(short.to_string(), encoded);
        Ok(self)
    }

    /// Encode `value` only when present.
    pub fn optional<V: Into<LogicalValue>>(
        &mut self,
        long_name: &str,
        value: Option<V>,
    ) -> Result<&mut Self, CodecError> {
        match value {
            Some(value) => self.field(long_name, value),
            None => {
                // Still reject names outside the vocabulary.
                self.names.require_short(long_name)?;
                Ok(self)
            }
        }
    }

    pub fn finish(self) -> Item {
        self.item
    }
}
