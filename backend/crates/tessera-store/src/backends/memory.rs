//! Process-local implementation of the table service.
//!
//! Mirrors the service rules the rest of the crate depends on: schema key
//! extraction, batch size limits, conditional writes, index validation and
//! "not found" for tables that are not active yet. Rows keep insertion order,
//! which makes queries deterministic under test.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use tessera_commons::{AttributeValue, Item};

use super::{MAX_BATCH_GET_KEYS, MAX_BATCH_WRITE_ITEMS};
use crate::backend_trait::TableBackend;
use crate::error::BackendError;
use crate::types::{
    count_keys, count_write_requests, BatchGetOutput, BatchWriteOutput, KeyAttribute,
    KeysByTable, PutItemRequest, QueryRequest, TableDescription, TableSchema, TableStatus,
    WriteRequest, WriteRequestsByTable,
};

type RowKey = (AttributeValue, Option<AttributeValue>);

struct MemoryTable {
    schema: TableSchema,
    status: TableStatus,
    /// Describe calls left before a `Creating` table turns active.
    pending_polls: u32,
    next_seq: u64,
    rows: BTreeMap<u64, Item>,
    keys: HashMap<RowKey, u64>,
}

impl MemoryTable {
    fn new(schema: TableSchema, activation_polls: u32) -> Self {
        let status = if activation_polls == 0 {
            TableStatus::Active
        } else {
            TableStatus::Creating
        };
        Self {
            schema,
            status,
            pending_polls: activation_polls,
            next_seq: 0,
            rows: BTreeMap::new(),
            keys: HashMap::new(),
        }
    }

    fn row_key(&self, item: &Item) -> Result<RowKey, BackendError> {
        let hash = key_value(&self.schema.hash_key, item)?;
        let range = match &self.schema.range_key {
            Some(range_key) => Some(key_value(range_key, item)?),
            None => None,
        };
        Ok((hash, range))
    }

    fn validate_item(&self, item: &Item) -> Result<RowKey, BackendError> {
        let key = self.row_key(item)?;
        for index in &self.schema.global_secondary_indexes {
            for attr in std::iter::once(&index.hash_key).chain(index.range_key.iter()) {
                if let Some(value) = item.get(&attr.name) {
                    if !attr.scalar_type.matches(value) {
                        return Err(BackendError::Validation(format!(
                            "Type mismatch for index key {} of index {}: expected {} but found {}",
                            attr.name,
                            index.index_name,
                            attr.scalar_type.as_str(),
                            value.tag()
                        )));
                    }
                }
            }
        }
        Ok(key)
    }

    fn get(&self, key: &RowKey) -> Option<&Item> {
        self.keys.get(key).and_then(|seq| self.rows.get(seq))
    }

    fn put(&mut self, key: RowKey, item: Item) {
        match self.keys.get(&key) {
            Some(seq) => {
                self.rows.insert(*seq, item);
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.rows.insert(seq, item);
                self.keys.insert(key, seq);
            }
        }
    }

    fn delete(&mut self, key: &RowKey) {
        if let Some(seq) = self.keys.remove(key) {
            self.rows.remove(&seq);
        }
    }
}

fn key_value(attr: &KeyAttribute, item: &Item) -> Result<AttributeValue, BackendError> {
    match item.get(&attr.name) {
        Some(value) if attr.scalar_type.matches(value) => Ok(value.clone()),
        Some(value) => Err(BackendError::Validation(format!(
            "Type mismatch for key {}: expected {} but found {}",
            attr.name,
            attr.scalar_type.as_str(),
            value.tag()
        ))),
        None => Err(BackendError::Validation(format!(
            "One of the required keys was not given a value: {}",
            attr.name
        ))),
    }
}

fn not_found(table: &str) -> BackendError {
    BackendError::ResourceNotFound(format!("Requested resource not found: Table: {} not found", table))
}

/// In-memory table service.
///
/// # Example
///
/// ```rust
/// use tessera_store::{InMemoryBackend, KeyAttribute, TableBackend, TableSchema};
///
/// # tokio_test_block(async {
/// let backend = InMemoryBackend::new();
/// backend
///     .create_table(&TableSchema::new("orders", KeyAttribute::string("id")))
///     .await
///     .unwrap();
/// assert_eq!(backend.list_tables().await.unwrap(), vec!["orders".to_string()]);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub struct InMemoryBackend {
    tables: RwLock<HashMap<String, MemoryTable>>,
    activation_polls: u32,
}

impl InMemoryBackend {
    /// Backend whose tables are active as soon as they are created.
    pub fn new() -> Self {
        Self::with_activation_polls(0)
    }

    /// Backend whose new tables stay `Creating` for `polls` describe calls.
    pub fn with_activation_polls(polls: u32) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            activation_polls: polls,
        }
    }

    /// All rows of a table in insertion order. Empty for unknown tables.
    pub fn scan(&self, table: &str) -> Vec<Item> {
        self.tables
            .read()
            .get(table)
            .map(|t| t.rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, |t| t.rows.len())
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.read().contains_key(table)
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn active<'a>(
    tables: &'a HashMap<String, MemoryTable>,
    table: &str,
) -> Result<&'a MemoryTable, BackendError> {
    match tables.get(table) {
        Some(t) if t.status == TableStatus::Active => Ok(t),
        _ => Err(not_found(table)),
    }
}

fn active_mut<'a>(
    tables: &'a mut HashMap<String, MemoryTable>,
    table: &str,
) -> Result<&'a mut MemoryTable, BackendError> {
    match tables.get_mut(table) {
        Some(t) if t.status == TableStatus::Active => Ok(t),
        _ => Err(not_found(table)),
    }
}

#[async_trait]
impl TableBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn describe_table(&self, table: &str) -> Result<TableDescription, BackendError> {
        let mut tables = self.tables.write();
        let t = tables.get_mut(table).ok_or_else(|| not_found(table))?;
        if t.status == TableStatus::Creating {
            t.pending_polls = t.pending_polls.saturating_sub(1);
            if t.pending_polls == 0 {
                t.status = TableStatus::Active;
            }
        }
        Ok(TableDescription {
            table_name: table.to_string(),
            status: t.status,
        })
    }

    async fn create_table(&self, schema: &TableSchema) -> Result<TableDescription, BackendError> {
        if schema.table_name.trim().is_empty() {
            return Err(BackendError::Validation("TableName must not be empty".to_string()));
        }
        let mut tables = self.tables.write();
        if tables.contains_key(&schema.table_name) {
            return Err(BackendError::ResourceInUse(format!(
                "Table already exists: {}",
                schema.table_name
            )));
        }
        let table = MemoryTable::new(schema.clone(), self.activation_polls);
        let description = TableDescription {
            table_name: schema.table_name.clone(),
            status: table.status,
        };
        tables.insert(schema.table_name.clone(), table);
        Ok(description)
    }

    async fn delete_table(&self, table: &str) -> Result<(), BackendError> {
        self.tables
            .write()
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| not_found(table))
    }

    async fn list_tables(&self) -> Result<Vec<String>, BackendError> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn put_item(&self, request: PutItemRequest) -> Result<(), BackendError> {
        let mut tables = self.tables.write();
        let t = active_mut(&mut tables, &request.table)?;
        let key = t.validate_item(&request.item)?;
        if let Some(condition) = &request.condition {
            if !condition.holds(t.get(&key)) {
                return Err(BackendError::ConditionalCheckFailed(
                    "The conditional request failed".to_string(),
                ));
            }
        }
        t.put(key, request.item);
        Ok(())
    }

    async fn get_item(&self, table: &str, key: &Item) -> Result<Option<Item>, BackendError> {
        let tables = self.tables.read();
        let t = active(&tables, table)?;
        let key = t.row_key(key)?;
        Ok(t.get(&key).cloned())
    }

    async fn query(&self, request: QueryRequest) -> Result<Vec<Item>, BackendError> {
        let tables = self.tables.read();
        let t = active(&tables, &request.table)?;

        let hash_key = match &request.index {
            Some(index_name) => {
                let index = t.schema.index(index_name).ok_or_else(|| {
                    BackendError::Validation(format!(
                        "The table does not have the specified index: {}",
                        index_name
                    ))
                })?;
                &index.hash_key.name
            }
            None => &t.schema.hash_key.name,
        };
        if !request.key_conditions.iter().any(|(name, _)| name == hash_key) {
            return Err(BackendError::Validation(format!(
                "Query condition missed key schema element: {}",
                hash_key
            )));
        }

        Ok(t.rows
            .values()
            .filter(|row| request.matches(row))
            .cloned()
            .collect())
    }

    async fn batch_write(
        &self,
        request_items: WriteRequestsByTable,
    ) -> Result<BatchWriteOutput, BackendError> {
        let total = count_write_requests(&request_items);
        if total == 0 || total > MAX_BATCH_WRITE_ITEMS {
            return Err(BackendError::Validation(format!(
                "Too many or too few items requested for the BatchWriteItem call: {}",
                total
            )));
        }

        let mut tables = self.tables.write();

        // Validate everything first; the service rejects the whole call on any bad entry.
        let mut resolved = Vec::with_capacity(total);
        for (table, requests) in &request_items {
            let t = active(&tables, table)?;
            for request in requests {
                match request {
                    WriteRequest::Put { item } => {
                        resolved.push((table.as_str(), t.validate_item(item)?, Some(item)))
                    }
                    WriteRequest::Delete { key } => {
                        resolved.push((table.as_str(), t.row_key(key)?, None))
                    }
                }
            }
        }

        for (table, key, item) in resolved {
            let t = active_mut(&mut tables, table)?;
            match item {
                Some(item) => t.put(key, item.clone()),
                None => t.delete(&key),
            }
        }

        Ok(BatchWriteOutput::default())
    }

    async fn batch_get(&self, request_keys: KeysByTable) -> Result<BatchGetOutput, BackendError> {
        let total = count_keys(&request_keys);
        if total == 0 || total > MAX_BATCH_GET_KEYS {
            return Err(BackendError::Validation(format!(
                "Too many or too few keys requested for the BatchGetItem call: {}",
                total
            )));
        }

        let tables = self.tables.read();
        let mut output = BatchGetOutput::default();
        for (table, request) in &request_keys {
            let t = active(&tables, table)?;
            let mut rows = Vec::new();
            for key in &request.keys {
                if let Some(row) = t.get(&t.row_key(key)?) {
                    rows.push(row.clone());
                }
            }
            output.responses.insert(table.clone(), rows);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Condition, KeysAndAttributes};

    fn item(pairs: &[(&str, &str)]) -> Item {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), AttributeValue::string(*v)))
            .collect()
    }

    fn schema() -> TableSchema {
        TableSchema::new("shards", KeyAttribute::string("SN")).with_index(
            "by_type",
            KeyAttribute::string("ET"),
            Some(KeyAttribute::string("AT")),
        )
    }

    #[tokio::test]
    async fn test_create_twice_is_in_use() {
        let backend = InMemoryBackend::new();
        backend.create_table(&schema()).await.unwrap();
        let err = backend.create_table(&schema()).await.unwrap_err();
        assert!(matches!(err, BackendError::ResourceInUse(_)));
    }

    #[tokio::test]
    async fn test_put_get_overwrite_keeps_position() {
        let backend = InMemoryBackend::new();
        backend.create_table(&schema()).await.unwrap();

        for sn in ["a1", "b1", "c1"] {
            backend
                .put_item(PutItemRequest::new("shards", item(&[("SN", sn), ("ET", "tl")])))
                .await
                .unwrap();
        }
        backend
            .put_item(PutItemRequest::new("shards", item(&[("SN", "a1"), ("ET", "tb")])))
            .await
            .unwrap();

        let rows = backend.scan("shards");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["ET"].as_str(), Some("tb"));

        let got = backend
            .get_item("shards", &item(&[("SN", "b1")]))
            .await
            .unwrap();
        assert_eq!(got.unwrap()["ET"].as_str(), Some("tl"));
    }

    #[tokio::test]
    async fn test_conditional_put() {
        let backend = InMemoryBackend::new();
        backend.create_table(&schema()).await.unwrap();

        let request = PutItemRequest::new("shards", item(&[("SN", "a1"), ("AT", "0")]))
            .with_condition(Condition::AttributeNotExists("SN".to_string()));
        backend.put_item(request.clone()).await.unwrap();
        let err = backend.put_item(request).await.unwrap_err();
        assert!(err.is_conditional_check_failed());

        let claim = PutItemRequest::new("shards", item(&[("SN", "a1"), ("AT", "1")]))
            .with_condition(Condition::AttributeEquals {
                name: "AT".to_string(),
                value: AttributeValue::string("0"),
            });
        backend.put_item(claim.clone()).await.unwrap();
        assert!(backend.put_item(claim).await.unwrap_err().is_conditional_check_failed());
    }

    #[tokio::test]
    async fn test_query_index() {
        let backend = InMemoryBackend::new();
        backend.create_table(&schema()).await.unwrap();
        for (sn, et, at) in [("x1", "tl", "0"), ("x2", "tb", "0"), ("x3", "tl", "1"), ("x4", "tl", "0")] {
            backend
                .put_item(PutItemRequest::new(
                    "shards",
                    item(&[("SN", sn), ("ET", et), ("AT", at)]),
                ))
                .await
                .unwrap();
        }

        let rows = backend
            .query(
                QueryRequest::new("shards")
                    .on_index("by_type")
                    .key_eq("ET", AttributeValue::string("tl"))
                    .key_eq("AT", AttributeValue::string("0")),
            )
            .await
            .unwrap();
        let names: Vec<_> = rows.iter().map(|r| r["SN"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["x1", "x4"]);

        let err = backend
            .query(QueryRequest::new("shards").on_index("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Validation(_)));
    }

    #[tokio::test]
    async fn test_batch_limits_and_missing_table() {
        let backend = InMemoryBackend::new();
        backend.create_table(&schema()).await.unwrap();

        let mut too_many = WriteRequestsByTable::new();
        too_many.insert(
            "shards".to_string(),
            (0..26)
                .map(|i| WriteRequest::put(item(&[("SN", format!("s{}", i).as_str())])))
                .collect(),
        );
        assert!(matches!(
            backend.batch_write(too_many).await.unwrap_err(),
            BackendError::Validation(_)
        ));

        let mut missing = KeysByTable::new();
        missing.insert(
            "nope".to_string(),
            KeysAndAttributes::new(vec![item(&[("SN", "s1")])]),
        );
        assert!(backend.batch_get(missing).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_creating_table_is_not_found_until_active() {
        let backend = InMemoryBackend::with_activation_polls(2);
        let created = backend.create_table(&schema()).await.unwrap();
        assert_eq!(created.status, TableStatus::Creating);

        let err = backend
            .put_item(PutItemRequest::new("shards", item(&[("SN", "a1")])))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        assert_eq!(backend.describe_table("shards").await.unwrap().status, TableStatus::Creating);
        assert_eq!(backend.describe_table("shards").await.unwrap().status, TableStatus::Active);
    }
}
