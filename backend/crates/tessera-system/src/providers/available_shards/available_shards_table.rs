//! Row codec for the available shards table.

use once_cell::sync::Lazy;
use tessera_commons::codec::encode_field;
use tessera_commons::{
    decode_item, AllocationType, AttributeValue, AvailableShard, CodecError, EntityType, Item,
    LogicalValue, NameMap, RecordEncoder, ShardName,
};

pub(crate) const SHARD_NAME: &str = "shard_name";
pub(crate) const ENTITY_TYPE: &str = "entity_type";
pub(crate) const ALLOCATION_TYPE: &str = "allocation_type";
const CREATED_AT: &str = "created_at";
const UPDATED_AT: &str = "updated_at";

static PAIRS: &[(&str, &str)] = &[
    (SHARD_NAME, "SN"),
    (ENTITY_TYPE, "ET"),
    (ALLOCATION_TYPE, "AT"),
    (CREATED_AT, "C"),
    (UPDATED_AT, "U"),
];

pub static AVAILABLE_SHARD_NAMES: Lazy<NameMap> = Lazy::new(|| NameMap::new(PAIRS));

pub fn encode_available_shard(shard: &AvailableShard) -> Result<Item, CodecError> {
    let mut encoder = RecordEncoder::new(&AVAILABLE_SHARD_NAMES);
    encoder
        .field(SHARD_NAME, shard.shard_name.as_str())?
        .field(ENTITY_TYPE, shard.entity_type.code())?
        .field(ALLOCATION_TYPE, shard.allocation_type.code())?
        .field(CREATED_AT, shard.created_at)?
        .field(UPDATED_AT, shard.updated_at)?;
    Ok(encoder.finish())
}

pub fn decode_available_shard(item: &Item) -> Result<AvailableShard, CodecError> {
    let record = decode_item(&AVAILABLE_SHARD_NAMES, item)?;

    let name = record.require_string(SHARD_NAME)?;
    let shard_name = ShardName::new(name).map_err(|e| CodecError::InvalidValue {
        field: SHARD_NAME.to_string(),
        message: e.to_string(),
    })?;

    let code = record.require_string(ENTITY_TYPE)?;
    let entity_type = EntityType::from_code(&code).ok_or_else(|| CodecError::InvalidValue {
        field: ENTITY_TYPE.to_string(),
        message: format!("unknown entity type code '{}'", code),
    })?;

    let code = record.require_string(ALLOCATION_TYPE)?;
    let allocation_type =
        AllocationType::from_code(&code).ok_or_else(|| CodecError::InvalidValue {
            field: ALLOCATION_TYPE.to_string(),
            message: format!("unknown allocation type code '{}'", code),
        })?;

    let created_at = record.require_i64(CREATED_AT)?;
    let updated_at = record.i64(UPDATED_AT)?.unwrap_or(created_at);

    Ok(AvailableShard {
        shard_name,
        entity_type,
        allocation_type,
        created_at,
        updated_at,
    })
}

/// Primary key of a shard row.
pub fn shard_key(shard_name: &ShardName) -> Result<Item, CodecError> {
    let (short, value) = encode_field(
        &AVAILABLE_SHARD_NAMES,
        SHARD_NAME,
        &LogicalValue::from(shard_name.as_str()),
    )?;
    Ok(Item::from([(short.to_string(), value)]))
}

/// Wire name and value of a field, for query and condition expressions.
pub(crate) fn wire_field(
    long_name: &str,
    value: &str,
) -> Result<(&'static str, AttributeValue), CodecError> {
    encode_field(&AVAILABLE_SHARD_NAMES, long_name, &LogicalValue::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_bijective() {
        assert!(AVAILABLE_SHARD_NAMES.is_bijective());
        for (long, short) in AVAILABLE_SHARD_NAMES.pairs() {
            assert_eq!(AVAILABLE_SHARD_NAMES.long_name_for(short), Some(long));
        }
    }

    #[test]
    fn test_encode_uses_codes() {
        let shard = AvailableShard::new_disabled(
            ShardName::new("tl_shard_1").unwrap(),
            EntityType::TransactionLog,
        );
        let item = encode_available_shard(&shard).unwrap();

        assert_eq!(item["SN"].as_str(), Some("tl_shard_1"));
        assert_eq!(item["ET"].as_str(), Some("tl"));
        assert_eq!(item["AT"].as_str(), Some("0"));
        assert!(item["C"].as_number().is_some());

        let decoded = decode_available_shard(&item).unwrap();
        assert_eq!(decoded, shard);
    }

    #[test]
    fn test_decode_rejects_unknown_codes() {
        let mut item = Item::new();
        item.insert("SN".to_string(), AttributeValue::string("tl_shard_1"));
        item.insert("ET".to_string(), AttributeValue::string("zz"));
        item.insert("AT".to_string(), AttributeValue::string("0"));
        item.insert("C".to_string(), AttributeValue::number(1));

        let err = decode_available_shard(&item).unwrap_err();
        assert!(matches!(err, CodecError::InvalidValue { .. }));
    }
}
