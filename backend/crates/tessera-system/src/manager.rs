//! Shard registration and assignment.

use std::sync::Arc;

use log::{error, info, warn};
use parking_lot::Mutex;
use tessera_commons::{AllocationType, AvailableShard, EntityType, ManagedShard, ShardName};

use crate::error::{Result, ShardError};
use crate::registry::ShardRegistry;

/// Passes over the disabled pool before giving up on concurrent claims.
const MAX_CLAIM_ROUNDS: usize = 3;

/// What `add_shard` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddShardOutcome {
    Created,
    /// The shard was already registered for the same entity type.
    AlreadyRegistered,
}

/// Registers shards and assigns them to sharding keys.
///
/// Assignment is sticky: once `(identifier, entity_type)` has a shard it
/// keeps it. New assignments claim the oldest disabled shard of the entity
/// type with a compare-and-swap on its allocation state, so concurrent
/// callers never share a claim.
pub struct ShardManager {
    registry: Arc<ShardRegistry>,
    /// Shards this process claimed but lost the assignment race for.
    orphaned: Mutex<Vec<ShardName>>,
}

impl ShardManager {
    pub fn new(registry: Arc<ShardRegistry>) -> Self {
        Self {
            registry,
            orphaned: Mutex::new(Vec::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ShardRegistry> {
        &self.registry
    }

    /// Shards left `allocated` without an owner after lost assignment races,
    /// in the order they were lost. Each one is reserve capacity an operator
    /// has to reclaim or replace.
    pub fn orphaned_shards(&self) -> Vec<ShardName> {
        self.orphaned.lock().clone()
    }

    /// Register a reserve shard for `entity_type`.
    ///
    /// Registering the same name for the same entity type again is a no-op;
    /// registering it for a different one is a `ShardConflict`.
    pub async fn add_shard(&self, shard_name: &str, entity_type: EntityType) -> Result<AddShardOutcome> {
        let shard_name = ShardName::new(shard_name)?;
        let shard = AvailableShard::new_disabled(shard_name.clone(), entity_type);

        if self.registry.put_available_shard(&shard).await? {
            return Ok(AddShardOutcome::Created);
        }

        match self.registry.get_available_shard(&shard_name).await? {
            Some(existing) if existing.entity_type == entity_type => {
                Ok(AddShardOutcome::AlreadyRegistered)
            }
            Some(existing) => Err(ShardError::ShardConflict {
                id: "sh_add_1",
                shard_name,
                existing: existing.entity_type,
                requested: entity_type,
            }),
            None => Err(ShardError::validation(
                "sh_add_2",
                format!("shard {} vanished while being registered", shard_name),
            )),
        }
    }

    /// Shards filtered by entity type and allocation state, from raw strings.
    ///
    /// Unknown entity types or allocation states are validation errors.
    pub async fn get_shards_by_type(
        &self,
        entity_type: &str,
        shard_type: &str,
    ) -> Result<Vec<AvailableShard>> {
        let entity_type: EntityType = entity_type.parse()?;
        let allocation_type: AllocationType = shard_type.parse()?;
        self.shards_by_type(entity_type, allocation_type).await
    }

    pub async fn shards_by_type(
        &self,
        entity_type: EntityType,
        allocation_type: AllocationType,
    ) -> Result<Vec<AvailableShard>> {
        self.registry
            .get_shards_by_type_and_allocation(entity_type, allocation_type)
            .await
    }

    pub async fn get_managed_shard(
        &self,
        identifier: &str,
        entity_type: EntityType,
    ) -> Result<Option<ManagedShard>> {
        let identifier = validate_identifier(identifier)?;
        self.registry.get_managed_shard(identifier, entity_type).await
    }

    /// The shard serving `(identifier, entity_type)`, assigning one on first use.
    pub async fn assign_shard(&self, identifier: &str, entity_type: EntityType) -> Result<ManagedShard> {
        let identifier = validate_identifier(identifier)?;

        if let Some(existing) = self.registry.get_managed_shard(identifier, entity_type).await? {
            return Ok(existing);
        }

        let claimed = self.claim_disabled_shard(identifier, entity_type).await?;
        let managed = ManagedShard::new(identifier, entity_type, claimed.shard_name.clone());

        if self.registry.put_managed_shard(&managed).await? {
            info!(
                "Assigned shard {} to {} for {}",
                managed.shard_name, identifier, entity_type
            );
            return Ok(managed);
        }

        // A concurrent caller assigned this key first. Its row wins; the shard
        // claimed here stays allocated with no owner.
        let winner = self
            .registry
            .get_managed_shard(identifier, entity_type)
            .await?
            .ok_or_else(|| {
                ShardError::validation(
                    "sh_assign_3",
                    format!("assignment for {} / {} disappeared", identifier, entity_type),
                )
            })?;
        let orphaned = {
            let mut orphaned = self.orphaned.lock();
            orphaned.push(claimed.shard_name.clone());
            orphaned.len()
        };
        error!(
            "Lost assignment race for {} / {}: using {}, shard {} stays allocated with no owner \
             ({} orphaned shard(s) in this process)",
            identifier, entity_type, winner.shard_name, claimed.shard_name, orphaned
        );
        Ok(winner)
    }

    async fn claim_disabled_shard(
        &self,
        identifier: &str,
        entity_type: EntityType,
    ) -> Result<AvailableShard> {
        for round in 0..MAX_CLAIM_ROUNDS {
            let pool = self
                .registry
                .get_shards_by_type_and_allocation(entity_type, AllocationType::Disabled)
                .await?;
            if pool.is_empty() {
                break;
            }
            for candidate in &pool {
                if let Some(allocated) = self.registry.mark_allocated(candidate).await? {
                    return Ok(allocated);
                }
            }
            warn!(
                "Every disabled {} shard was claimed concurrently (round {}/{})",
                entity_type,
                round + 1,
                MAX_CLAIM_ROUNDS
            );
        }

        warn!("No disabled {} shard left for {}", entity_type, identifier);
        Err(ShardError::CapacityExhausted {
            id: "sh_assign_2",
            entity_type,
            identifier: identifier.to_string(),
        })
    }
}

fn validate_identifier(identifier: &str) -> Result<&str> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(ShardError::validation("sh_assign_1", "identifier cannot be empty"));
    }
    Ok(trimmed)
}
