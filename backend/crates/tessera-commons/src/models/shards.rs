//! Shard bookkeeping rows stored in the control tables.

use serde::{Deserialize, Serialize};

use crate::models::{AllocationType, EntityType, ShardName};
use crate::now_millis;

/// One physical backing table known to the registry.
///
/// `shard_name` is unique across all entity types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableShard {
    pub shard_name: ShardName,
    pub entity_type: EntityType,
    pub allocation_type: AllocationType,
    /// Unix timestamp in milliseconds
    pub created_at: i64,
    /// Unix timestamp in milliseconds
    pub updated_at: i64,
}

impl AvailableShard {
    /// A freshly registered reserve shard.
    pub fn new_disabled(shard_name: ShardName, entity_type: EntityType) -> Self {
        let now = now_millis();
        Self {
            shard_name,
            entity_type,
            allocation_type: AllocationType::Disabled,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.allocation_type == AllocationType::Allocated
    }

    /// Transition to `Allocated`, stamping `updated_at`.
    pub fn allocate(mut self) -> Self {
        self.allocation_type = AllocationType::Allocated;
        self.updated_at = now_millis().max(self.created_at);
        self
    }
}

/// Maps a sharding key `(identifier, entity_type)` to its active shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedShard {
    pub identifier: String,
    pub entity_type: EntityType,
    pub shard_name: ShardName,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ManagedShard {
    pub fn new(identifier: impl Into<String>, entity_type: EntityType, shard_name: ShardName) -> Self {
        let now = now_millis();
        Self {
            identifier: identifier.into(),
            entity_type,
            shard_name,
            created_at: now,
            updated_at: now,
        }
    }
}
