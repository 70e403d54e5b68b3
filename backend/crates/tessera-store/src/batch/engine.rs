use std::sync::Arc;

use super::{
    BatchGet, BatchOperation, BatchReadOutcome, BatchWrite, BatchWriteOutcome, CancellationToken,
    RetryPolicy,
};
use crate::backend_trait::TableBackend;
use crate::error::Result;
use crate::types::{KeysByTable, WriteRequestsByTable};

/// Entry point for batch calls against one backend.
///
/// Cheap to clone; shares the backend and the cancellation flag.
#[derive(Clone)]
pub struct BatchRetryEngine {
    backend: Arc<dyn TableBackend>,
    policy: RetryPolicy,
    cancellation: Option<CancellationToken>,
}

impl BatchRetryEngine {
    pub fn new(backend: Arc<dyn TableBackend>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            policy,
            cancellation: None,
        }
    }

    /// Stop retrying once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn backend(&self) -> &Arc<dyn TableBackend> {
        &self.backend
    }

    pub async fn run_batch_write(
        &self,
        request_items: WriteRequestsByTable,
        max_retries: u32,
    ) -> Result<BatchWriteOutcome> {
        BatchWrite::new(self.backend.clone(), self.policy, request_items, max_retries)
            .with_cancellation(self.cancellation.clone())
            .perform()
            .await
    }

    pub async fn run_batch_read(
        &self,
        request_keys: KeysByTable,
        max_retries: u32,
    ) -> Result<BatchReadOutcome> {
        BatchGet::new(self.backend.clone(), self.policy, request_keys, max_retries)
            .with_cancellation(self.cancellation.clone())
            .perform()
            .await
    }

    /// `run_batch_write` with the policy's retry budget.
    pub async fn write(&self, request_items: WriteRequestsByTable) -> Result<BatchWriteOutcome> {
        self.run_batch_write(request_items, self.policy.max_retries).await
    }

    /// `run_batch_read` with the policy's retry budget.
    pub async fn read(&self, request_keys: KeysByTable) -> Result<BatchReadOutcome> {
        self.run_batch_read(request_keys, self.policy.max_retries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::error::BackendError;
    use crate::test_utils::{BatchFault, FaultInjectingBackend};
    use crate::types::{KeyAttribute, KeysAndAttributes, TableSchema, WriteRequest};
    use tessera_commons::{AttributeValue, ErrorCategory, Item};

    fn row(id: &str) -> Item {
        let mut item = Item::new();
        item.insert("id".to_string(), AttributeValue::string(id));
        item.insert("v".to_string(), AttributeValue::number(1));
        item
    }

    fn key(id: &str) -> Item {
        let mut item = Item::new();
        item.insert("id".to_string(), AttributeValue::string(id));
        item
    }

    fn writes(table: &str, ids: &[&str]) -> WriteRequestsByTable {
        let mut requests = WriteRequestsByTable::new();
        requests.insert(
            table.to_string(),
            ids.iter().map(|id| WriteRequest::put(row(id))).collect(),
        );
        requests
    }

    async fn setup(tables: &[&str]) -> (Arc<FaultInjectingBackend>, BatchRetryEngine) {
        let backend = Arc::new(FaultInjectingBackend::new());
        for table in tables {
            backend
                .create_table(&TableSchema::new(*table, KeyAttribute::string("id")))
                .await
                .unwrap();
        }
        let engine = BatchRetryEngine::new(backend.clone(), RetryPolicy::immediate(3));
        (backend, engine)
    }

    #[tokio::test]
    async fn test_write_converges_after_partial_failures() {
        let (backend, engine) = setup(&["orders"]).await;
        backend.push_write_fault(BatchFault::UnprocessedAll);
        backend.push_write_fault(BatchFault::UnprocessedAll);

        let outcome = engine
            .run_batch_write(writes("orders", &["a", "b"]), 3)
            .await
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.attempts, 3);
        assert!(!outcome.cancelled);
        assert_eq!(backend.write_calls(), 3);
        assert_eq!(backend.inner().row_count("orders"), 2);
    }

    #[tokio::test]
    async fn test_write_exhaustion_returns_residual() {
        let (backend, engine) = setup(&["orders"]).await;
        backend.set_persistent_write_fault(Some(BatchFault::UnprocessedAll));

        let input = writes("orders", &["a", "b", "c"]);
        let outcome = engine.run_batch_write(input.clone(), 2).await.unwrap();

        assert!(!outcome.is_complete());
        assert_eq!(outcome.unprocessed, input);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(backend.write_calls(), 3);
    }

    #[tokio::test]
    async fn test_write_resubmits_only_unprocessed_tables() {
        let (backend, engine) = setup(&["a_table", "b_table"]).await;
        backend.push_write_fault(BatchFault::UnprocessedTables(vec!["b_table".to_string()]));

        let mut input = writes("a_table", &["1", "2"]);
        input.extend(writes("b_table", &["3"]));
        let outcome = engine.run_batch_write(input, 3).await.unwrap();

        assert!(outcome.is_complete());
        let submitted = backend.submitted_writes();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[1].keys().collect::<Vec<_>>(), vec!["b_table"]);
        assert_eq!(backend.inner().row_count("a_table"), 2);
        assert_eq!(backend.inner().row_count("b_table"), 1);
    }

    #[tokio::test]
    async fn test_write_fatal_error_aborts() {
        let (backend, engine) = setup(&["orders"]).await;
        backend.push_write_fault(BatchFault::Fail(BackendError::Validation(
            "bad item".to_string(),
        )));

        let err = engine
            .run_batch_write(writes("orders", &["a"]), 3)
            .await
            .unwrap_err();

        assert_eq!(err.internal_id(), "s_bw_execute_1");
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(backend.write_calls(), 1);
    }

    #[tokio::test]
    async fn test_write_not_found_is_retried() {
        let (backend, engine) = setup(&["orders"]).await;
        backend.push_write_fault(BatchFault::Fail(BackendError::ResourceNotFound(
            "orders".to_string(),
        )));

        let outcome = engine
            .run_batch_write(writes("orders", &["a"]), 3)
            .await
            .unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn test_zero_retries_is_single_attempt() {
        let (backend, engine) = setup(&["orders"]).await;
        backend.set_persistent_write_fault(Some(BatchFault::UnprocessedAll));

        let outcome = engine
            .run_batch_write(writes("orders", &["a"]), 0)
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.unprocessed_count(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_retries() {
        let (backend, engine) = setup(&["orders"]).await;
        backend.set_persistent_write_fault(Some(BatchFault::UnprocessedAll));
        let token = CancellationToken::new();
        let engine = engine.with_cancellation(token.clone());
        token.cancel();

        let outcome = engine
            .run_batch_write(writes("orders", &["a", "b"]), 5)
            .await
            .unwrap();
        assert!(outcome.cancelled);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.unprocessed_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_backoff() {
        let (backend, _) = setup(&["orders"]).await;
        backend.set_persistent_write_fault(Some(BatchFault::UnprocessedAll));
        let policy = RetryPolicy {
            write_fixed: Duration::from_secs(3600),
            ..RetryPolicy::immediate(5)
        };
        let token = CancellationToken::new();
        let engine = BatchRetryEngine::new(backend.clone(), policy).with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });
        let started = tokio::time::Instant::now();
        let outcome = engine
            .run_batch_write(writes("orders", &["a"]), 5)
            .await
            .unwrap();
        canceller.await.unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(backend.write_calls(), 1);
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_invalid_write_never_reaches_backend() {
        let (backend, engine) = setup(&["orders"]).await;

        let err = engine
            .run_batch_write(WriteRequestsByTable::new(), 3)
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);

        let mut empty_list = WriteRequestsByTable::new();
        empty_list.insert("orders".to_string(), Vec::new());
        assert!(engine.run_batch_write(empty_list, 3).await.is_err());

        let ids: Vec<String> = (0..26).map(|i| format!("id{}", i)).collect();
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        let err = engine
            .run_batch_write(writes("orders", &ids), 3)
            .await
            .unwrap_err();
        assert_eq!(err.internal_id(), "s_bw_validate_4");

        assert_eq!(backend.write_calls(), 0);
    }

    #[tokio::test]
    async fn test_read_accumulates_across_attempts() {
        let (backend, engine) = setup(&["a_table", "b_table"]).await;
        engine.run_batch_write(writes("a_table", &["1", "2"]), 0).await.unwrap();
        engine.run_batch_write(writes("b_table", &["3", "4"]), 0).await.unwrap();
        backend.push_read_fault(BatchFault::UnprocessedTables(vec!["b_table".to_string()]));

        let mut keys = KeysByTable::new();
        keys.insert("a_table".to_string(), KeysAndAttributes::new(vec![key("1"), key("2")]));
        keys.insert("b_table".to_string(), KeysAndAttributes::new(vec![key("3"), key("4")]));

        let outcome = engine.run_batch_read(keys, 3).await.unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.responses["a_table"].len(), 2);
        assert_eq!(outcome.responses["b_table"].len(), 2);
        assert_eq!(outcome.into_items().len(), 4);
    }

    #[tokio::test]
    async fn test_read_exhaustion_keeps_partial_rows() {
        let (backend, engine) = setup(&["a_table", "b_table"]).await;
        engine.run_batch_write(writes("a_table", &["1"]), 0).await.unwrap();
        backend.set_persistent_read_fault(Some(BatchFault::UnprocessedTables(vec![
            "b_table".to_string(),
        ])));

        let mut keys = KeysByTable::new();
        keys.insert("a_table".to_string(), KeysAndAttributes::new(vec![key("1")]));
        keys.insert("b_table".to_string(), KeysAndAttributes::new(vec![key("9")]));

        let outcome = engine.run_batch_read(keys, 2).await.unwrap();
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.responses["a_table"].len(), 1);
        assert_eq!(outcome.unprocessed_count(), 1);
        assert!(outcome.unprocessed.contains_key("b_table"));
    }

    #[tokio::test]
    async fn test_read_fatal_error() {
        let (backend, engine) = setup(&["a_table"]).await;
        backend.push_read_fault(BatchFault::Fail(BackendError::Service {
            code: "AccessDeniedException".to_string(),
            message: "denied".to_string(),
        }));

        let mut keys = KeysByTable::new();
        keys.insert("a_table".to_string(), KeysAndAttributes::new(vec![key("1")]));
        let err = engine.run_batch_read(keys, 3).await.unwrap_err();
        assert_eq!(err.internal_id(), "s_bg_execute_1");
        assert_eq!(err.category(), ErrorCategory::BackendFatal);
        assert_eq!(backend.read_calls(), 1);
    }
}
