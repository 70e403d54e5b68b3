//! Typed access to both shard control tables.

use std::sync::Arc;

use tessera_commons::{AllocationType, AvailableShard, EntityType, ManagedShard, ShardName};
use tessera_configs::ShardSettings;
use tessera_store::{BatchRetryEngine, BatchWriteOutcome, TableBackend};

use crate::error::Result;
use crate::providers::{AvailableShardsProvider, ManagedShardsProvider};

/// Registry over the available and managed shard tables.
///
/// Point operations go straight to the backend; bulk population goes through
/// the batch engine.
pub struct ShardRegistry {
    available: AvailableShardsProvider,
    managed: ManagedShardsProvider,
    engine: BatchRetryEngine,
}

impl ShardRegistry {
    pub fn new(
        backend: Arc<dyn TableBackend>,
        engine: BatchRetryEngine,
        settings: &ShardSettings,
    ) -> Self {
        Self {
            available: AvailableShardsProvider::new(
                backend.clone(),
                settings.available_shards_table.clone(),
            ),
            managed: ManagedShardsProvider::new(backend, settings.managed_shards_table.clone()),
            engine,
        }
    }

    pub fn available(&self) -> &AvailableShardsProvider {
        &self.available
    }

    pub fn managed(&self) -> &ManagedShardsProvider {
        &self.managed
    }

    pub fn engine(&self) -> &BatchRetryEngine {
        &self.engine
    }

    pub fn available_shards_table(&self) -> &str {
        self.available.table_name()
    }

    pub fn managed_shards_table(&self) -> &str {
        self.managed.table_name()
    }

    pub async fn put_available_shard(&self, shard: &AvailableShard) -> Result<bool> {
        self.available.put_available_shard(shard).await
    }

    pub async fn get_available_shard(&self, shard_name: &ShardName) -> Result<Option<AvailableShard>> {
        self.available.get_available_shard(shard_name).await
    }

    pub async fn get_shards_by_type_and_allocation(
        &self,
        entity_type: EntityType,
        allocation_type: AllocationType,
    ) -> Result<Vec<AvailableShard>> {
        self.available.get_shards(entity_type, Some(allocation_type)).await
    }

    /// Every shard of an entity type regardless of allocation state.
    pub async fn get_shards_by_type(&self, entity_type: EntityType) -> Result<Vec<AvailableShard>> {
        self.available.get_shards(entity_type, None).await
    }

    pub async fn mark_allocated(&self, shard: &AvailableShard) -> Result<Option<AvailableShard>> {
        self.available.mark_allocated(shard).await
    }

    pub async fn put_available_shards(
        &self,
        shards: &[AvailableShard],
    ) -> Result<Vec<BatchWriteOutcome>> {
        self.available.put_available_shards(&self.engine, shards).await
    }

    pub async fn put_managed_shard(&self, shard: &ManagedShard) -> Result<bool> {
        self.managed.put_managed_shard(shard).await
    }

    pub async fn get_managed_shard(
        &self,
        identifier: &str,
        entity_type: EntityType,
    ) -> Result<Option<ManagedShard>> {
        self.managed.get_managed_shard(identifier, entity_type).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system_table_definitions::{
        available_shards_table_definition, managed_shards_table_definition,
    };
    use tessera_store::test_utils::{BatchFault, FaultInjectingBackend};
    use tessera_store::RetryPolicy;

    async fn registry() -> (Arc<FaultInjectingBackend>, ShardRegistry) {
        let backend = Arc::new(FaultInjectingBackend::new());
        let settings = ShardSettings::default();
        backend
            .create_table(&available_shards_table_definition(&settings.available_shards_table))
            .await
            .unwrap();
        backend
            .create_table(&managed_shards_table_definition(&settings.managed_shards_table))
            .await
            .unwrap();
        let engine = BatchRetryEngine::new(backend.clone(), RetryPolicy::immediate(3));
        let registry = ShardRegistry::new(backend.clone(), engine, &settings);
        (backend, registry)
    }

    fn shard(name: &str, entity_type: EntityType, created_at: i64) -> AvailableShard {
        let mut shard = AvailableShard::new_disabled(ShardName::new(name).unwrap(), entity_type);
        shard.created_at = created_at;
        shard.updated_at = created_at;
        shard
    }

    #[tokio::test]
    async fn test_put_is_conditional_on_absence() {
        let (_, registry) = registry().await;
        let s = shard("tl_a", EntityType::TransactionLog, 1);
        assert!(registry.put_available_shard(&s).await.unwrap());
        assert!(!registry.put_available_shard(&s).await.unwrap());
    }

    #[tokio::test]
    async fn test_query_filters_and_orders() {
        let (_, registry) = registry().await;
        for s in [
            shard("tl_c", EntityType::TransactionLog, 5),
            shard("tl_b", EntityType::TransactionLog, 1),
            shard("tl_a", EntityType::TransactionLog, 5),
            shard("tb_a", EntityType::TokenBalance, 0),
        ] {
            registry.put_available_shard(&s).await.unwrap();
        }
        let allocated = registry
            .mark_allocated(&shard("tl_c", EntityType::TransactionLog, 5))
            .await
            .unwrap();
        assert!(allocated.unwrap().is_allocated());

        let disabled = registry
            .get_shards_by_type_and_allocation(EntityType::TransactionLog, AllocationType::Disabled)
            .await
            .unwrap();
        let names: Vec<&str> = disabled.iter().map(|s| s.shard_name.as_str()).collect();
        assert_eq!(names, vec!["tl_b", "tl_a"]);

        let all = registry
            .get_shards_by_type(EntityType::TransactionLog)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_same_millisecond_keeps_insertion_order() {
        let (_, registry) = registry().await;
        for name in ["tl_zz", "tl_mm", "tl_aa"] {
            registry
                .put_available_shard(&shard(name, EntityType::TransactionLog, 7))
                .await
                .unwrap();
        }

        let disabled = registry
            .get_shards_by_type_and_allocation(EntityType::TransactionLog, AllocationType::Disabled)
            .await
            .unwrap();
        let names: Vec<&str> = disabled.iter().map(|s| s.shard_name.as_str()).collect();
        assert_eq!(names, vec!["tl_zz", "tl_mm", "tl_aa"]);
    }

    #[tokio::test]
    async fn test_mark_allocated_is_compare_and_swap() {
        let (_, registry) = registry().await;
        let s = shard("tb_x", EntityType::TokenBalance, 1);
        registry.put_available_shard(&s).await.unwrap();

        assert!(registry.mark_allocated(&s).await.unwrap().is_some());
        assert!(registry.mark_allocated(&s).await.unwrap().is_none());

        let stored = registry.get_available_shard(&s.shard_name).await.unwrap().unwrap();
        assert_eq!(stored.allocation_type, AllocationType::Allocated);
    }

    #[tokio::test]
    async fn test_managed_shard_is_written_once() {
        let (_, registry) = registry().await;
        let first = ManagedShard::new(
            "client1",
            EntityType::TokenBalance,
            ShardName::new("tb_1").unwrap(),
        );
        let second = ManagedShard::new(
            "client1",
            EntityType::TokenBalance,
            ShardName::new("tb_2").unwrap(),
        );
        assert!(registry.put_managed_shard(&first).await.unwrap());
        assert!(!registry.put_managed_shard(&second).await.unwrap());

        let stored = registry
            .get_managed_shard("client1", EntityType::TokenBalance)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.shard_name.as_str(), "tb_1");
        assert!(registry
            .get_managed_shard("client1", EntityType::TransactionLog)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_bulk_put_retries_through_engine() {
        let (backend, registry) = registry().await;
        backend.push_write_fault(BatchFault::UnprocessedAll);

        let shards: Vec<AvailableShard> = (0..30)
            .map(|i| shard(&format!("tl_bulk_{:02}", i), EntityType::TransactionLog, i))
            .collect();
        let outcomes = registry.put_available_shards(&shards).await.unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.is_complete()));
        assert_eq!(outcomes[0].attempts, 2);
        assert_eq!(backend.inner().row_count(registry.available_shards_table()), 30);
    }
}
