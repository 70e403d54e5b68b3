//! Row codec for the managed shards table.

use once_cell::sync::Lazy;
use tessera_commons::{
    decode_item, CodecError, EntityType, Item, ManagedShard, NameMap, RecordEncoder, ShardName,
};

pub(crate) const IDENTIFIER: &str = "identifier";
const ENTITY_TYPE: &str = "entity_type";
const SHARD_NAME: &str = "shard_name";
const CREATED_AT: &str = "created_at";
const UPDATED_AT: &str = "updated_at";

static PAIRS: &[(&str, &str)] = &[
    (IDENTIFIER, "ID"),
    (ENTITY_TYPE, "ET"),
    (SHARD_NAME, "SN"),
    (CREATED_AT, "C"),
    (UPDATED_AT, "U"),
];

pub static MANAGED_SHARD_NAMES: Lazy<NameMap> = Lazy::new(|| NameMap::new(PAIRS));

pub fn encode_managed_shard(shard: &ManagedShard) -> Result<Item, CodecError> {
    let mut encoder = RecordEncoder::new(&MANAGED_SHARD_NAMES);
    encoder
        .field(IDENTIFIER, shard.identifier.as_str())?
        .field(ENTITY_TYPE, shard.entity_type.code())?
        .field(SHARD_NAME, shard.shard_name.as_str())?
        .field(CREATED_AT, shard.created_at)?
        .field(UPDATED_AT, shard.updated_at)?;
    Ok(encoder.finish())
}

pub fn decode_managed_shard(item: &Item) -> Result<ManagedShard, CodecError> {
    let record = decode_item(&MANAGED_SHARD_NAMES, item)?;

    let code = record.require_string(ENTITY_TYPE)?;
    let entity_type = EntityType::from_code(&code).ok_or_else(|| CodecError::InvalidValue {
        field: ENTITY_TYPE.to_string(),
        message: format!("unknown entity type code '{}'", code),
    })?;
    let shard_name =
        ShardName::new(record.require_string(SHARD_NAME)?).map_err(|e| CodecError::InvalidValue {
            field: SHARD_NAME.to_string(),
            message: e.to_string(),
        })?;
    let created_at = record.require_i64(CREATED_AT)?;

    Ok(ManagedShard {
        identifier: record.require_string(IDENTIFIER)?,
        entity_type,
        shard_name,
        created_at,
        updated_at: record.i64(UPDATED_AT)?.unwrap_or(created_at),
    })
}

/// Primary key `(ID, ET)` of a managed shard row.
pub fn managed_key(identifier: &str, entity_type: EntityType) -> Result<Item, CodecError> {
    let mut encoder = RecordEncoder::new(&MANAGED_SHARD_NAMES);
    encoder
        .field(IDENTIFIER, identifier)?
        .field(ENTITY_TYPE, entity_type.code())?;
    Ok(encoder.finish())
}
