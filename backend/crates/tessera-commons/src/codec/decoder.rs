use std::collections::BTreeMap;

use log::debug;

use crate::codec::{Decimal, LogicalValue, NameMap};
use crate::errors::CodecError;
use crate::models::{AttributeValue, Item};

/// Decode a persisted item back to long names.
///
/// Attributes outside the vocabulary are skipped: rows written by newer
/// versions of a model must stay readable by older ones.
pub fn decode_item(names: &NameMap, item: &Item) -> Result<DecodedRecord, CodecError> {
    Ok(DecodedRecord(decode_map(names, item)?))
}

fn decode_map(names: &NameMap, item: &Item) -> Result<BTreeMap<String, LogicalValue>, CodecError> {
    let mut fields = BTreeMap::new();
    for (short, value) in item {
        let Some(long) = names.long_name_for(short) else {
            debug!("Skipping attribute '{}' outside the vocabulary", short);
            continue;
        };
        if let Some(decoded) = decode_value(names, long, value)? {
            fields.insert(long.to_string(), decoded);
        }
    }
    Ok(fields)
}

fn decode_value(
    names: &NameMap,
    field: &str,
    value: &AttributeValue,
) -> Result<Option<LogicalValue>, CodecError> {
    Ok(Some(match value {
        AttributeValue::String(s) => LogicalValue::String(s.clone()),
        AttributeValue::Number(n) => {
            LogicalValue::Number(Decimal::parse(n).ok_or_else(|| CodecError::InvalidNumber {
                field: field.to_string(),
                value: n.clone(),
            })?)
        }
        AttributeValue::Bool(b) => LogicalValue::Bool(*b),
        AttributeValue::Null(_) => return Ok(None),
        AttributeValue::List(values) => {
            let mut decoded = Vec::with_capacity(values.len());
            for v in values {
                if let Some(v) = decode_value(names, field, v)? {
                    decoded.push(v);
                }
            }
            LogicalValue::List(decoded)
        }
        AttributeValue::Map(item) => LogicalValue::Map(decode_map(names, item)?),
    }))
}

/// Decoded fields keyed by long name, with typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedRecord(BTreeMap<String, LogicalValue>);

impl DecodedRecord {
    pub fn from_fields(fields: BTreeMap<String, LogicalValue>) -> Self {
        Self(fields)
    }

    pub fn get(&self, long_name: &str) -> Option<&LogicalValue> {
        self.0.get(long_name)
    }

    pub fn contains(&self, long_name: &str) -> bool {
        self.0.contains_key(long_name)
    }

    pub fn fields(&self) -> &BTreeMap<String, LogicalValue> {
        &self.0
    }

    pub fn into_fields(self) -> BTreeMap<String, LogicalValue> {
        self.0
    }

    pub fn string(&self, long_name: &str) -> Result<Option<String>, CodecError> {
        match self.0.get(long_name) {
            None => Ok(None),
            Some(LogicalValue::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(mismatch(long_name, "string", other)),
        }
    }

    pub fn number(&self, long_name: &str) -> Result<Option<Decimal>, CodecError> {
        match self.0.get(long_name) {
            None => Ok(None),
            Some(LogicalValue::Number(n)) => Ok(Some(n.clone())),
            Some(other) => Err(mismatch(long_name, "number", other)),
        }
    }

    pub fn i64(&self, long_name: &str) -> Result<Option<i64>, CodecError> {
        self.number(long_name)?
            .map(|n| {
                n.to_i64().ok_or_else(|| CodecError::InvalidNumber {
                    field: long_name.to_string(),
                    value: n.to_string(),
                })
            })
            .transpose()
    }

    pub fn u64(&self, long_name: &str) -> Result<Option<u64>, CodecError> {
        self.number(long_name)?
            .map(|n| {
                n.to_u64().ok_or_else(|| CodecError::InvalidNumber {
                    field: long_name.to_string(),
                    value: n.to_string(),
                })
            })
            .transpose()
    }

    pub fn list(&self, long_name: &str) -> Result<Option<&[LogicalValue]>, CodecError> {
        match self.0.get(long_name) {
            None => Ok(None),
            Some(LogicalValue::List(values)) => Ok(Some(values)),
            Some(other) => Err(mismatch(long_name, "list", other)),
        }
    }

    pub fn require_string(&self, long_name: &str) -> Result<String, CodecError> {
        self.string(long_name)?
            .ok_or_else(|| CodecError::MissingField(long_name.to_string()))
    }

    pub fn require_i64(&self, long_name: &str) -> Result<i64, CodecError> {
        self.i64(long_name)?
            .ok_or_else(|| CodecError::MissingField(long_name.to_string()))
    }
}

fn mismatch(field: &str, expected: &'static str, found: &LogicalValue) -> CodecError {
    CodecError::TypeMismatch {
        field: field.to_string(),
        expected,
        found: found.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RecordEncoder;

    static PAIRS: &[(&str, &str)] = &[
        ("transaction_uuid", "txu"),
        ("block_number", "bn"),
        ("transfer_events", "te"),
        ("to_address", "ta"),
    ];

    #[test]
    fn test_decode_restores_long_names() {
        let names = NameMap::new(PAIRS);
        let mut encoder = RecordEncoder::new(&names);
        encoder.key("transaction_uuid", "U-9").unwrap();
        encoder.field("block_number", 1200u64).unwrap();
        let item = encoder.finish();

        let record = decode_item(&names, &item).unwrap();
        assert_eq!(record.require_string("transaction_uuid").unwrap(), "u-9");
        assert_eq!(record.u64("block_number").unwrap(), Some(1200));
        assert_eq!(record.string("to_address").unwrap(), None);
    }

    #[test]
    fn test_unknown_short_names_are_skipped() {
        let names = NameMap::new(PAIRS);
        let mut item = Item::new();
        item.insert("txu".to_string(), AttributeValue::string("a"));
        item.insert("zz".to_string(), AttributeValue::string("b"));

        let record = decode_item(&names, &item).unwrap();
        assert_eq!(record.fields().len(), 1);
    }

    #[test]
    fn test_type_mismatch_is_reported() {
        let names = NameMap::new(PAIRS);
        let mut item = Item::new();
        item.insert("bn".to_string(), AttributeValue::string("twelve"));

        let record = decode_item(&names, &item).unwrap();
        assert!(matches!(
            record.number("block_number"),
            Err(CodecError::TypeMismatch { expected: "number", found: "string", .. })
        ));
    }

    #[test]
    fn test_malformed_number_fails_decode() {
        let names = NameMap::new(PAIRS);
        let mut item = Item::new();
        item.insert("bn".to_string(), AttributeValue::Number("12x".to_string()));
        assert!(decode_item(&names, &item).is_err());
    }
}
