//! End-to-end shard lifecycle against the in-memory backend: bootstrap,
//! registration, listing and assignment.

use std::sync::Arc;

use tessera_commons::{AllocationType, EntityType, ErrorCategory};
use tessera_configs::ShardSettings;
use tessera_store::{BatchRetryEngine, InMemoryBackend, RetryPolicy};
use tessera_system::{
    AddShardOutcome, MigrationState, ShardManager, ShardMigration, ShardRegistry,
};

struct Harness {
    backend: Arc<InMemoryBackend>,
    manager: Arc<ShardManager>,
    migration: ShardMigration,
}

fn harness(settings: ShardSettings) -> Harness {
    let backend = Arc::new(InMemoryBackend::new());
    let engine = BatchRetryEngine::new(backend.clone(), RetryPolicy::immediate(2));
    let registry = Arc::new(ShardRegistry::new(backend.clone(), engine, &settings));
    let manager = Arc::new(ShardManager::new(registry));
    let migration = ShardMigration::new(backend.clone(), manager.clone(), settings);
    Harness {
        backend,
        manager,
        migration,
    }
}

fn fast_settings() -> ShardSettings {
    ShardSettings {
        table_ready_poll_ms: 0,
        ..ShardSettings::default()
    }
}

#[tokio::test]
async fn test_bootstrap_then_add_and_list() {
    let h = harness(fast_settings());
    let report = h.migration.run().await.unwrap();
    assert_eq!(report.final_state, MigrationState::Seeded);

    let listed = h
        .manager
        .get_shards_by_type("transactionLog", "disabled")
        .await
        .unwrap();
    assert!(listed.is_empty());

    let outcome = h
        .manager
        .add_shard("tl_shard_1", EntityType::TransactionLog)
        .await
        .unwrap();
    assert_eq!(outcome, AddShardOutcome::Created);

    let listed = h
        .manager
        .get_shards_by_type("transactionLog", "disabled")
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].shard_name.as_str(), "tl_shard_1");
    assert_eq!(listed[0].allocation_type, AllocationType::Disabled);
}

#[tokio::test]
async fn test_listing_rejects_unknown_vocabulary() {
    let h = harness(fast_settings());
    h.migration.run().await.unwrap();

    let err = h
        .manager
        .get_shards_by_type("balances", "disabled")
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);

    let err = h
        .manager
        .get_shards_by_type("transactionLog", "test")
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
}

#[tokio::test]
async fn test_assignment_after_bootstrap() {
    let mut settings = fast_settings();
    settings.defaults.insert(
        "transactionLog".to_string(),
        vec!["tl_shard_1".to_string(), "tl_shard_2".to_string()],
    );
    settings
        .defaults
        .insert("tokenBalance".to_string(), vec!["tb_shard_1".to_string()]);
    let h = harness(settings);

    let report = h.migration.run().await.unwrap();
    assert_eq!(report.final_state, MigrationState::Ready);

    let first = h
        .manager
        .assign_shard("client-a", EntityType::TransactionLog)
        .await
        .unwrap();
    let second = h
        .manager
        .assign_shard("client-b", EntityType::TransactionLog)
        .await
        .unwrap();
    assert_ne!(first.shard_name, second.shard_name);

    let again = h
        .manager
        .assign_shard("client-a", EntityType::TransactionLog)
        .await
        .unwrap();
    assert_eq!(again.shard_name, first.shard_name);

    let err = h
        .manager
        .assign_shard("client-c", EntityType::TransactionLog)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::CapacityExhausted);

    // The token balance pool is independent.
    let balance = h
        .manager
        .assign_shard("client-c", EntityType::TokenBalance)
        .await
        .unwrap();
    assert_eq!(balance.shard_name.as_str(), "tb_shard_1");

    assert!(h
        .manager
        .shards_by_type(EntityType::TransactionLog, AllocationType::Disabled)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(h.backend.row_count("managed_shards"), 3);
}
