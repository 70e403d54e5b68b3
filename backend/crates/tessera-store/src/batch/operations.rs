//! Batch service objects: [`BatchWrite`] and [`BatchGet`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, warn};
use tessera_commons::Item;

use super::{CancellationToken, RetryPolicy};
use crate::backend_trait::TableBackend;
use crate::backends::{MAX_BATCH_GET_KEYS, MAX_BATCH_WRITE_ITEMS};
use crate::error::{Result, StoreError};
use crate::types::{count_keys, count_write_requests, KeysByTable, WriteRequestsByTable};

/// A batch call that validates its input before touching the backend.
#[async_trait]
pub trait BatchOperation: Send + Sync {
    type Output: Send;

    /// Reject malformed requests without any backend call.
    fn validate_params(&self) -> Result<()>;

    /// Run the submit/retry loop.
    async fn execute_request(&self) -> Result<Self::Output>;

    async fn perform(&self) -> Result<Self::Output> {
        self.validate_params()?;
        self.execute_request().await
    }
}

/// Final state of a batch write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchWriteOutcome {
    /// Requests still not applied when the loop stopped.
    pub unprocessed: WriteRequestsByTable,
    /// Attempts made, counting the first.
    pub attempts: u32,
    /// The loop stopped because the caller cancelled it.
    pub cancelled: bool,
}

impl BatchWriteOutcome {
    pub fn is_complete(&self) -> bool {
        self.unprocessed.is_empty()
    }

    pub fn unprocessed_count(&self) -> usize {
        count_write_requests(&self.unprocessed)
    }
}

/// Final state of a batch read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReadOutcome {
    /// Rows returned across all attempts, per table.
    pub responses: BTreeMap<String, Vec<Item>>,
    pub unprocessed: KeysByTable,
    pub attempts: u32,
    pub cancelled: bool,
}

impl BatchReadOutcome {
    pub fn is_complete(&self) -> bool {
        self.unprocessed.is_empty()
    }

    pub fn unprocessed_count(&self) -> usize {
        count_keys(&self.unprocessed)
    }

    /// All returned rows, flattened in table order.
    pub fn into_items(self) -> Vec<Item> {
        self.responses.into_values().flatten().collect()
    }
}

/// Sleep for `delay` unless the token fires first. Returns `true` when
/// cancelled.
async fn backoff(delay: Duration, cancellation: Option<&CancellationToken>) -> bool {
    match cancellation {
        Some(token) => tokio::select! {
            _ = token.cancelled() => true,
            _ = tokio::time::sleep(delay) => false,
        },
        None => {
            tokio::time::sleep(delay).await;
            false
        }
    }
}

fn tables_label<'a>(tables: impl Iterator<Item = &'a String>) -> String {
    tables.map(String::as_str).collect::<Vec<_>>().join(",")
}

/// Batch write driven to completion against partial application.
pub struct BatchWrite {
    backend: Arc<dyn TableBackend>,
    policy: RetryPolicy,
    request_items: WriteRequestsByTable,
    max_retries: u32,
    cancellation: Option<CancellationToken>,
}

impl BatchWrite {
    pub fn new(
        backend: Arc<dyn TableBackend>,
        policy: RetryPolicy,
        request_items: WriteRequestsByTable,
        max_retries: u32,
    ) -> Self {
        Self {
            backend,
            policy,
            request_items,
            max_retries,
            cancellation: None,
        }
    }

    pub fn with_cancellation(mut self, token: Option<CancellationToken>) -> Self {
        self.cancellation = token;
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().map_or(false, CancellationToken::is_cancelled)
    }
}

#[async_trait]
impl BatchOperation for BatchWrite {
    type Output = BatchWriteOutcome;

    fn validate_params(&self) -> Result<()> {
        if self.request_items.is_empty() {
            return Err(StoreError::validation("s_bw_validate_1", "batch write has no request items"));
        }
        for (table, requests) in &self.request_items {
            if table.trim().is_empty() {
                return Err(StoreError::validation("s_bw_validate_2", "batch write names an empty table"));
            }
            if requests.is_empty() {
                return Err(StoreError::validation(
                    "s_bw_validate_3",
                    format!("batch write has no requests for table {}", table),
                ));
            }
        }
        let total = count_write_requests(&self.request_items);
        if total > MAX_BATCH_WRITE_ITEMS {
            return Err(StoreError::validation(
                "s_bw_validate_4",
                format!(
                    "batch write has {} requests, the limit is {}",
                    total, MAX_BATCH_WRITE_ITEMS
                ),
            ));
        }
        Ok(())
    }

    async fn execute_request(&self) -> Result<BatchWriteOutcome> {
        let mut remaining = self.request_items.clone();
        let mut attempts = 0;
        let mut cancelled = false;

        for attempt in 1..=self.max_retries.saturating_add(1) {
            if attempt > 1 {
                let delay = self.policy.write_delay(attempt - 1);
                if self.is_cancelled() || backoff(delay, self.cancellation.as_ref()).await {
                    warn!(
                        "batch_write cancelled before attempt {} with {} requests pending",
                        attempt,
                        count_write_requests(&remaining)
                    );
                    cancelled = true;
                    break;
                }
            }

            attempts = attempt;
            let submitted: BTreeMap<String, usize> = remaining
                .iter()
                .map(|(table, requests)| (table.clone(), requests.len()))
                .collect();
            debug!(
                "batch_write attempt {} on [{}] ({} requests)",
                attempt,
                tables_label(submitted.keys()),
                count_write_requests(&remaining)
            );

            match self.backend.batch_write(remaining.clone()).await {
                Ok(output) => {
                    remaining = output.unprocessed_items;
                    remaining.retain(|_, requests| !requests.is_empty());
                }
                Err(err) if err.is_not_found() => {
                    // Resubmit the whole set; the table may still be coming up.
                    warn!(
                        "batch_write attempt {} on [{}] hit a missing resource, retrying all: {}",
                        attempt,
                        tables_label(submitted.keys()),
                        err
                    );
                }
                Err(err) => {
                    let table = tables_label(submitted.keys());
                    error!("batch_write attempt {} on [{}] failed: {}", attempt, table, err);
                    return Err(StoreError::Backend {
                        id: "s_bw_execute_1",
                        table,
                        attempt,
                        source: err,
                    });
                }
            }

            for (table, requests) in &remaining {
                warn!(
                    "batch_write table {} has {} unprocessed of {} submitted items (attempt {})",
                    table,
                    requests.len(),
                    submitted.get(table).copied().unwrap_or_default(),
                    attempt
                );
            }

            if remaining.is_empty() {
                break;
            }
        }

        if !cancelled {
            for (table, requests) in &remaining {
                error!(
                    "batch_write table {} still has {} unprocessed items after {} attempts",
                    table,
                    requests.len(),
                    attempts
                );
            }
        }

        Ok(BatchWriteOutcome {
            unprocessed: remaining,
            attempts,
            cancelled,
        })
    }
}

/// Batch read that accumulates rows across retries.
pub struct BatchGet {
    backend: Arc<dyn TableBackend>,
    policy: RetryPolicy,
    request_keys: KeysByTable,
    max_retries: u32,
    cancellation: Option<CancellationToken>,
}

impl BatchGet {
    pub fn new(
        backend: Arc<dyn TableBackend>,
        policy: RetryPolicy,
        request_keys: KeysByTable,
        max_retries: u32,
    ) -> Self {
        Self {
            backend,
            policy,
            request_keys,
            max_retries,
            cancellation: None,
        }
    }

    pub fn with_cancellation(mut self, token: Option<CancellationToken>) -> Self {
        self.cancellation = token;
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().map_or(false, CancellationToken::is_cancelled)
    }
}

#[async_trait]
impl BatchOperation for BatchGet {
    type Output = BatchReadOutcome;

    fn validate_params(&self) -> Result<()> {
        if self.request_keys.is_empty() {
            return Err(StoreError::validation("s_bg_validate_1", "batch get has no request keys"));
        }
        for (table, keys) in &self.request_keys {
            if table.trim().is_empty() {
                return Err(StoreError::validation("s_bg_validate_2", "batch get names an empty table"));
            }
            if keys.keys.is_empty() {
                return Err(StoreError::validation(
                    "s_bg_validate_3",
                    format!("batch get has no keys for table {}", table),
                ));
            }
        }
        let total = count_keys(&self.request_keys);
        if total > MAX_BATCH_GET_KEYS {
            return Err(StoreError::validation(
                "s_bg_validate_4",
                format!("batch get has {} keys, the limit is {}", total, MAX_BATCH_GET_KEYS),
            ));
        }
        Ok(())
    }

    async fn execute_request(&self) -> Result<BatchReadOutcome> {
        let mut remaining = self.request_keys.clone();
        let mut responses: BTreeMap<String, Vec<Item>> = BTreeMap::new();
        let mut attempts = 0;
        let mut cancelled = false;

        for attempt in 1..=self.max_retries.saturating_add(1) {
            if attempt > 1 {
                let delay = self.policy.read_delay(attempt - 1);
                if self.is_cancelled() || backoff(delay, self.cancellation.as_ref()).await {
                    warn!(
                        "batch_get cancelled before attempt {} with {} keys pending",
                        attempt,
                        count_keys(&remaining)
                    );
                    cancelled = true;
                    break;
                }
            }

            attempts = attempt;
            let submitted: BTreeMap<String, usize> = remaining
                .iter()
                .map(|(table, keys)| (table.clone(), keys.keys.len()))
                .collect();
            debug!(
                "batch_get attempt {} on [{}] ({} keys)",
                attempt,
                tables_label(submitted.keys()),
                count_keys(&remaining)
            );

            match self.backend.batch_get(remaining.clone()).await {
                Ok(output) => {
                    for (table, rows) in output.responses {
                        responses.entry(table).or_default().extend(rows);
                    }
                    remaining = output.unprocessed_keys;
                    remaining.retain(|_, keys| !keys.keys.is_empty());
                }
                Err(err) if err.is_not_found() => {
                    warn!(
                        "batch_get attempt {} on [{}] hit a missing resource, retrying all: {}",
                        attempt,
                        tables_label(submitted.keys()),
                        err
                    );
                }
                Err(err) => {
                    let table = tables_label(submitted.keys());
                    error!("batch_get attempt {} on [{}] failed: {}", attempt, table, err);
                    return Err(StoreError::Backend {
                        id: "s_bg_execute_1",
                        table,
                        attempt,
                        source: err,
                    });
                }
            }

            for (table, keys) in &remaining {
                warn!(
                    "batch_get table {} has {} unprocessed of {} submitted keys (attempt {})",
                    table,
                    keys.keys.len(),
                    submitted.get(table).copied().unwrap_or_default(),
                    attempt
                );
            }

            if remaining.is_empty() {
                break;
            }
        }

        if !cancelled {
            for (table, keys) in &remaining {
                error!(
                    "batch_get table {} still has {} unprocessed keys after {} attempts",
                    table,
                    keys.keys.len(),
                    attempts
                );
            }
        }

        Ok(BatchReadOutcome {
            responses,
            unprocessed: remaining,
            attempts,
            cancelled,
        })
    }
}
