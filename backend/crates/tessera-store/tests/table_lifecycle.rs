//! Table existence probes and activation waits against the in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use tessera_commons::{AttributeValue, Item};
use tessera_store::{
    table_exists, wait_for_table_active, BackendError, BatchRetryEngine, InMemoryBackend,
    KeyAttribute, KeysAndAttributes, KeysByTable, RetryPolicy, TableBackend, TableSchema,
    TableStatus, WriteRequest, WriteRequestsByTable,
};

fn schema(name: &str) -> TableSchema {
    TableSchema::new(name, KeyAttribute::string("id"))
}

#[tokio::test]
async fn test_table_exists_reports_deleted_for_unknown_tables() {
    let backend = InMemoryBackend::new();
    let existence = table_exists(&backend, "missing").await.unwrap();
    assert!(!existence.exists);
    assert_eq!(existence.status, TableStatus::Deleted);

    backend.create_table(&schema("present")).await.unwrap();
    let existence = table_exists(&backend, "present").await.unwrap();
    assert!(existence.exists);
    assert_eq!(existence.status, TableStatus::Active);
}

#[tokio::test]
async fn test_creating_table_does_not_exist_yet() {
    let backend = InMemoryBackend::with_activation_polls(3);
    backend.create_table(&schema("slow")).await.unwrap();

    let existence = table_exists(&backend, "slow").await.unwrap();
    assert!(!existence.exists);
    assert_eq!(existence.status, TableStatus::Creating);

    let description = wait_for_table_active(&backend, "slow", Duration::ZERO, 10)
        .await
        .unwrap();
    assert_eq!(description.status, TableStatus::Active);
}

#[tokio::test]
async fn test_wait_gives_up_after_max_polls() {
    let backend = InMemoryBackend::with_activation_polls(50);
    backend.create_table(&schema("slow")).await.unwrap();

    let err = wait_for_table_active(&backend, "slow", Duration::ZERO, 3)
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Service { .. }));
}

#[tokio::test]
async fn test_batch_against_table_that_becomes_active() {
    // Data calls on a creating table report not found until a status probe
    // activates it.
    let backend = Arc::new(InMemoryBackend::with_activation_polls(1));
    backend.create_table(&schema("orders")).await.unwrap();

    let mut item = Item::new();
    item.insert("id".to_string(), AttributeValue::string("o-1"));
    let mut requests = WriteRequestsByTable::new();
    requests.insert("orders".to_string(), vec![WriteRequest::put(item.clone())]);

    let engine = BatchRetryEngine::new(backend.clone(), RetryPolicy::immediate(2));
    let outcome = engine.run_batch_write(requests.clone(), 2).await.unwrap();
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.unprocessed, requests);

    wait_for_table_active(backend.as_ref(), "orders", Duration::ZERO, 5)
        .await
        .unwrap();
    let outcome = engine.run_batch_write(requests, 2).await.unwrap();
    assert!(outcome.is_complete());
    assert_eq!(outcome.attempts, 1);

    let mut keys = KeysByTable::new();
    keys.insert("orders".to_string(), KeysAndAttributes::new(vec![item]));
    let read = engine.run_batch_read(keys, 0).await.unwrap();
    assert_eq!(read.into_items().len(), 1);
}
