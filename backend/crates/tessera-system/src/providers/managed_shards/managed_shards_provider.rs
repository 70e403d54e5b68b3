//! Managed shards table provider.

use std::sync::Arc;

use log::debug;
use tessera_commons::{EntityType, ManagedShard};
use tessera_store::{Condition, PutItemRequest, TableBackend};

use super::managed_shards_table::{
    decode_managed_shard, encode_managed_shard, managed_key, IDENTIFIER, MANAGED_SHARD_NAMES,
};
use crate::error::{Result, ShardError};

pub struct ManagedShardsProvider {
    backend: Arc<dyn TableBackend>,
    table: String,
}

impl std::fmt::Debug for ManagedShardsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedShardsProvider")
            .field("table", &self.table)
            .finish()
    }
}

impl ManagedShardsProvider {
    pub fn new(backend: Arc<dyn TableBackend>, table: impl Into<String>) -> Self {
        Self {
            backend,
            table: table.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Insert an assignment unless the sharding key already has one.
    ///
    /// Returns `false` when another assignment exists.
    pub async fn put_managed_shard(&self, shard: &ManagedShard) -> Result<bool> {
        let item = encode_managed_shard(shard).map_err(|source| ShardError::Codec {
            id: "sh_ms_put_1",
            table: self.table.clone(),
            source,
        })?;
        let id = MANAGED_SHARD_NAMES
            .require_short(IDENTIFIER)
            .map_err(|source| ShardError::Codec {
                id: "sh_ms_put_2",
                table: self.table.clone(),
                source,
            })?;
        let request = PutItemRequest::new(&self.table, item)
            .with_condition(Condition::AttributeNotExists(id.to_string()));

        match self.backend.put_item(request).await {
            Ok(()) => Ok(true),
            Err(err) if err.is_conditional_check_failed() => {
                debug!(
                    "{} already has a {} shard in {}",
                    shard.identifier, shard.entity_type, self.table
                );
                Ok(false)
            }
            Err(err) => Err(ShardError::backend("sh_ms_put_3", &self.table, err)),
        }
    }

    pub async fn get_managed_shard(
        &self,
        identifier: &str,
        entity_type: EntityType,
    ) -> Result<Option<ManagedShard>> {
        let key = managed_key(identifier, entity_type).map_err(|source| ShardError::Codec {
            id: "sh_ms_get_1",
            table: self.table.clone(),
            source,
        })?;
        let item = self
            .backend
            .get_item(&self.table, &key)
            .await
            .map_err(|e| ShardError::backend("sh_ms_get_2", &self.table, e))?;
        item.map(|item| decode_managed_shard(&item))
            .transpose()
            .map_err(|source| ShardError::Codec {
                id: "sh_ms_get_3",
                table: self.table.clone(),
                source,
            })
    }
}
