//! Test utilities for tessera-store.
//!
//! [`FaultInjectingBackend`] wraps an [`InMemoryBackend`] and replays scripted
//! batch faults so retry behavior can be exercised without a real service.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tessera_commons::Item;

use crate::backend_trait::TableBackend;
use crate::backends::InMemoryBackend;
use crate::error::BackendError;
use crate::types::{
    BatchGetOutput, BatchWriteOutput, KeysByTable, PutItemRequest, QueryRequest,
    TableDescription, TableSchema, WriteRequestsByTable,
};

/// What the next batch call does instead of (or on top of) the real write/read.
#[derive(Debug, Clone)]
pub enum BatchFault {
    /// Apply nothing and hand the whole request back as unprocessed.
    UnprocessedAll,
    /// Apply every other table, hand these tables back as unprocessed.
    UnprocessedTables(Vec<String>),
    /// Fail the call.
    Fail(BackendError),
}

#[derive(Default)]
struct FaultScript {
    queued: VecDeque<BatchFault>,
    persistent: Option<BatchFault>,
}

impl FaultScript {
    fn next(&mut self) -> Option<BatchFault> {
        self.queued.pop_front().or_else(|| self.persistent.clone())
    }
}

/// In-memory backend with scripted batch failures and call accounting.
#[derive(Default)]
pub struct FaultInjectingBackend {
    inner: InMemoryBackend,
    write_faults: Mutex<FaultScript>,
    read_faults: Mutex<FaultScript>,
    write_calls: AtomicU32,
    read_calls: AtomicU32,
    submitted_writes: Mutex<Vec<WriteRequestsByTable>>,
    create_faults: Mutex<HashMap<String, BackendError>>,
}

impl FaultInjectingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a configured in-memory backend, e.g. one with slow activation.
    pub fn wrapping(inner: InMemoryBackend) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn inner(&self) -> &InMemoryBackend {
        &self.inner
    }

    /// Queue a fault for the next `batch_write` call.
    pub fn push_write_fault(&self, fault: BatchFault) {
        self.write_faults.lock().queued.push_back(fault);
    }

    /// Queue a fault for the next `batch_get` call.
    pub fn push_read_fault(&self, fault: BatchFault) {
        self.read_faults.lock().queued.push_back(fault);
    }

    /// Make every `create_table` call for `table` fail with `err`.
    pub fn fail_create_table(&self, table: impl Into<String>, err: BackendError) {
        self.create_faults.lock().insert(table.into(), err);
    }

    /// Fault applied to every `batch_write` once the queue is drained.
    pub fn set_persistent_write_fault(&self, fault: Option<BatchFault>) {
        self.write_faults.lock().persistent = fault;
    }

    pub fn set_persistent_read_fault(&self, fault: Option<BatchFault>) {
        self.read_faults.lock().persistent = fault;
    }

    pub fn write_calls(&self) -> u32 {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn read_calls(&self) -> u32 {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Every request passed to `batch_write`, in call order.
    pub fn submitted_writes(&self) -> Vec<WriteRequestsByTable> {
        self.submitted_writes.lock().clone()
    }
}

#[async_trait]
impl TableBackend for FaultInjectingBackend {
    fn name(&self) -> &str {
        "fault-injecting"
    }

    async fn describe_table(&self, table: &str) -> Result<TableDescription, BackendError> {
        self.inner.describe_table(table).await
    }

    async fn create_table(&self, schema: &TableSchema) -> Result<TableDescription, BackendError> {
        let fault = self.create_faults.lock().get(&schema.table_name).cloned();
        if let Some(err) = fault {
            return Err(err);
        }
        self.inner.create_table(schema).await
    }

    async fn delete_table(&self, table: &str) -> Result<(), BackendError> {
        self.inner.delete_table(table).await
    }

    async fn list_tables(&self) -> Result<Vec<String>, BackendError> {
        self.inner.list_tables().await
    }

    async fn put_item(&self, request: PutItemRequest) -> Result<(), BackendError> {
        self.inner.put_item(request).await
    }

    async fn get_item(&self, table: &str, key: &Item) -> Result<Option<Item>, BackendError> {
        self.inner.get_item(table, key).await
    }

    async fn query(&self, request: QueryRequest) -> Result<Vec<Item>, BackendError> {
        self.inner.query(request).await
    }

    async fn batch_write(
        &self,
        request_items: WriteRequestsByTable,
    ) -> Result<BatchWriteOutput, BackendError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted_writes.lock().push(request_items.clone());

        let fault = self.write_faults.lock().next();
        match fault {
            None => self.inner.batch_write(request_items).await,
            Some(BatchFault::Fail(err)) => Err(err),
            Some(BatchFault::UnprocessedAll) => Ok(BatchWriteOutput {
                unprocessed_items: request_items,
            }),
            Some(BatchFault::UnprocessedTables(tables)) => {
                let (held, applied): (WriteRequestsByTable, WriteRequestsByTable) = request_items
                    .into_iter()
                    .partition(|(table, _)| tables.contains(table));
                if !applied.is_empty() {
                    self.inner.batch_write(applied).await?;
                }
                Ok(BatchWriteOutput {
                    unprocessed_items: held,
                })
            }
        }
    }

    async fn batch_get(&self, request_keys: KeysByTable) -> Result<BatchGetOutput, BackendError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);

        let fault = self.read_faults.lock().next();
        match fault {
            None => self.inner.batch_get(request_keys).await,
            Some(BatchFault::Fail(err)) => Err(err),
            Some(BatchFault::UnprocessedAll) => Ok(BatchGetOutput {
                responses: Default::default(),
                unprocessed_keys: request_keys,
            }),
            Some(BatchFault::UnprocessedTables(tables)) => {
                let (held, fetched): (KeysByTable, KeysByTable) = request_keys
                    .into_iter()
                    .partition(|(table, _)| tables.contains(table));
                let mut output = if fetched.is_empty() {
                    BatchGetOutput::default()
                } else {
                    self.inner.batch_get(fetched).await?
                };
                output.unprocessed_keys = held;
                Ok(output)
            }
        }
    }
}
