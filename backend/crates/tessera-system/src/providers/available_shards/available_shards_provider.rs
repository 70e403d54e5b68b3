//! Available shards table provider.

use std::sync::Arc;

use log::{debug, info};
use tessera_commons::{AllocationType, AvailableShard, EntityType, ShardName};
use tessera_store::backends::MAX_BATCH_WRITE_ITEMS;
use tessera_store::{
    BatchRetryEngine, BatchWriteOutcome, Condition, PutItemRequest, QueryRequest, TableBackend,
    WriteRequest, WriteRequestsByTable,
};

use super::available_shards_table::{
    decode_available_shard, encode_available_shard, shard_key, wire_field, ALLOCATION_TYPE,
    ENTITY_TYPE, SHARD_NAME,
};
use crate::error::{Result, ShardError};
use crate::system_table_definitions::ENTITY_ALLOCATION_INDEX;

pub struct AvailableShardsProvider {
    backend: Arc<dyn TableBackend>,
    table: String,
}

impl std::fmt::Debug for AvailableShardsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailableShardsProvider")
            .field("table", &self.table)
            .finish()
    }
}

impl AvailableShardsProvider {
    pub fn new(backend: Arc<dyn TableBackend>, table: impl Into<String>) -> Self {
        Self {
            backend,
            table: table.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    fn codec_error(&self, id: &'static str, source: tessera_commons::CodecError) -> ShardError {
        ShardError::Codec {
            id,
            table: self.table.clone(),
            source,
        }
    }

    /// Insert a shard row unless one with the same name exists.
    ///
    /// Returns `false` when the name was already taken.
    pub async fn put_available_shard(&self, shard: &AvailableShard) -> Result<bool> {
        let item = encode_available_shard(shard).map_err(|e| self.codec_error("sh_as_put_1", e))?;
        let (sn, _) = wire_field(SHARD_NAME, shard.shard_name.as_str())
            .map_err(|e| self.codec_error("sh_as_put_2", e))?;
        let request = PutItemRequest::new(&self.table, item)
            .with_condition(Condition::AttributeNotExists(sn.to_string()));

        match self.backend.put_item(request).await {
            Ok(()) => {
                info!(
                    "Registered shard {} for {} in {}",
                    shard.shard_name, shard.entity_type, self.table
                );
                Ok(true)
            }
            Err(err) if err.is_conditional_check_failed() => {
                debug!("Shard {} already registered in {}", shard.shard_name, self.table);
                Ok(false)
            }
            Err(err) => Err(ShardError::backend("sh_as_put_3", &self.table, err)),
        }
    }

    pub async fn get_available_shard(&self, shard_name: &ShardName) -> Result<Option<AvailableShard>> {
        let key = shard_key(shard_name).map_err(|e| self.codec_error("sh_as_get_1", e))?;
        let item = self
            .backend
            .get_item(&self.table, &key)
            .await
            .map_err(|e| ShardError::backend("sh_as_get_2", &self.table, e))?;
        item.map(|item| decode_available_shard(&item))
            .transpose()
            .map_err(|e| self.codec_error("sh_as_get_3", e))
    }

    /// Shards of one entity type, optionally narrowed to one allocation state.
    ///
    /// Ordered by `created_at`; ties keep backend order.
    pub async fn get_shards(
        &self,
        entity_type: EntityType,
        allocation_type: Option<AllocationType>,
    ) -> Result<Vec<AvailableShard>> {
        let (et, et_value) = wire_field(ENTITY_TYPE, entity_type.code())
            .map_err(|e| self.codec_error("sh_as_query_1", e))?;
        let mut query = QueryRequest::new(&self.table)
            .on_index(ENTITY_ALLOCATION_INDEX)
            .key_eq(et, et_value);
        if let Some(allocation_type) = allocation_type {
            let (at, at_value) = wire_field(ALLOCATION_TYPE, allocation_type.code())
                .map_err(|e| self.codec_error("sh_as_query_2", e))?;
            query = query.key_eq(at, at_value);
        }

        let items = self
            .backend
            .query(query)
            .await
            .map_err(|e| ShardError::backend("sh_as_query_3", &self.table, e))?;

        let mut shards = items
            .iter()
            .map(decode_available_shard)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| self.codec_error("sh_as_query_4", e))?;
        // Stable: rows created in the same millisecond keep the order the
        // backend returned them in.
        shards.sort_by_key(|shard| shard.created_at);
        Ok(shards)
    }

    /// Move a disabled shard to `allocated`, only if it is still disabled.
    ///
    /// Returns `None` when a concurrent caller claimed it first.
    pub async fn mark_allocated(&self, shard: &AvailableShard) -> Result<Option<AvailableShard>> {
        let allocated = shard.clone().allocate();
        let item =
            encode_available_shard(&allocated).map_err(|e| self.codec_error("sh_as_alloc_1", e))?;
        let (at, disabled) = wire_field(ALLOCATION_TYPE, AllocationType::Disabled.code())
            .map_err(|e| self.codec_error("sh_as_alloc_2", e))?;
        let request = PutItemRequest::new(&self.table, item).with_condition(
            Condition::AttributeEquals {
                name: at.to_string(),
                value: disabled,
            },
        );

        match self.backend.put_item(request).await {
            Ok(()) => Ok(Some(allocated)),
            Err(err) if err.is_conditional_check_failed() => {
                debug!("Shard {} was claimed concurrently", shard.shard_name);
                Ok(None)
            }
            Err(err) => Err(ShardError::backend("sh_as_alloc_3", &self.table, err)),
        }
    }

    /// Unconditional bulk upsert through the batch engine, chunked to the
    /// service limit. Callers inspect the outcomes for residual items.
    pub async fn put_available_shards(
        &self,
        engine: &BatchRetryEngine,
        shards: &[AvailableShard],
    ) -> Result<Vec<BatchWriteOutcome>> {
        let mut outcomes = Vec::new();
        for chunk in shards.chunks(MAX_BATCH_WRITE_ITEMS) {
            let requests = chunk
                .iter()
                .map(|shard| encode_available_shard(shard).map(WriteRequest::put))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| self.codec_error("sh_as_bulk_1", e))?;
            let mut items = WriteRequestsByTable::new();
            items.insert(self.table.clone(), requests);
            outcomes.push(engine.write(items).await?);
        }
        Ok(outcomes)
    }
}
