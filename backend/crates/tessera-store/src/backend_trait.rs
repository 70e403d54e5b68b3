//! Backend client abstraction over the backing table service.
//!
//! `TableBackend` is the capability every other crate talks to. Two
//! implementations ship with the crate:
//! - [`InMemoryBackend`](crate::backends::InMemoryBackend): process-local tables
//!   for local runs and tests
//! - [`HttpBackend`](crate::backends::HttpBackend): DynamoDB JSON protocol over HTTP
//!
//! Batch primitives are best effort: `batch_write` and `batch_get` may apply
//! part of a request and return the remainder as unprocessed without failing.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tessera_commons::Item;

use crate::error::BackendError;
use crate::types::{
    BatchGetOutput, BatchWriteOutput, KeysByTable, PutItemRequest, QueryRequest, TableDescription,
    TableSchema, TableStatus, WriteRequestsByTable,
};

/// Async client for the backing table service.
///
/// Implementations must be thread-safe; callers hold them as `Arc<dyn TableBackend>`.
#[async_trait]
pub trait TableBackend: Send + Sync {
    /// Short label used in log lines (e.g. "memory", "http://127.0.0.1:8000").
    fn name(&self) -> &str;

    /// Status probe. `ResourceNotFound` when the table does not exist.
    async fn describe_table(&self, table: &str) -> Result<TableDescription, BackendError>;

    /// Create a table. `ResourceInUse` when it already exists.
    async fn create_table(&self, schema: &TableSchema) -> Result<TableDescription, BackendError>;

    /// Drop a table. Teardown and tests only.
    async fn delete_table(&self, table: &str) -> Result<(), BackendError>;

    async fn list_tables(&self) -> Result<Vec<String>, BackendError>;

    /// Single-row write, optionally guarded by a condition.
    async fn put_item(&self, request: PutItemRequest) -> Result<(), BackendError>;

    /// Strongly consistent point read by primary key.
    async fn get_item(&self, table: &str, key: &Item) -> Result<Option<Item>, BackendError>;

    /// All rows matching the equality key conditions, in storage order.
    async fn query(&self, request: QueryRequest) -> Result<Vec<Item>, BackendError>;

    async fn batch_write(
        &self,
        request_items: WriteRequestsByTable,
    ) -> Result<BatchWriteOutput, BackendError>;

    async fn batch_get(&self, request_keys: KeysByTable) -> Result<BatchGetOutput, BackendError>;
}

/// Result of [`table_exists`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableExistence {
    pub exists: bool,
    pub status: TableStatus,
}

/// Whether `table` exists and is active.
///
/// A table the service does not know reports `{ exists: false, status: Deleted }`.
/// Tables still being created exist as far as creation is concerned but report
/// `exists: false` until they turn active. Other errors propagate.
pub async fn table_exists(
    backend: &dyn TableBackend,
    table: &str,
) -> Result<TableExistence, BackendError> {
    match backend.describe_table(table).await {
        Ok(description) => Ok(TableExistence {
            exists: description.status == TableStatus::Active,
            status: description.status,
        }),
        Err(err) if err.is_not_found() => Ok(TableExistence {
            exists: false,
            status: TableStatus::Deleted,
        }),
        Err(err) => Err(err),
    }
}

/// Poll `describe_table` until the table is active.
///
/// A not-found answer counts as "not ready yet" since a freshly created table
/// may not be visible immediately.
pub async fn wait_for_table_active(
    backend: &dyn TableBackend,
    table: &str,
    poll_interval: Duration,
    max_polls: u32,
) -> Result<TableDescription, BackendError> {
    for poll in 0..max_polls.max(1) {
        match backend.describe_table(table).await {
            Ok(description) if description.status == TableStatus::Active => {
                return Ok(description)
            }
            Ok(description) => {
                debug!(
                    "Table {} is {} (poll {}/{}), waiting",
                    table,
                    description.status,
                    poll + 1,
                    max_polls
                );
            }
            Err(err) if err.is_not_found() => {
                debug!("Table {} not visible yet (poll {}/{})", table, poll + 1, max_polls);
            }
            Err(err) => return Err(err),
        }
        tokio::time::sleep(poll_interval).await;
    }

    Err(BackendError::Service {
        code: "TableNotActive".to_string(),
        message: format!("table {} did not become active after {} polls", table, max_polls),
    })
}
