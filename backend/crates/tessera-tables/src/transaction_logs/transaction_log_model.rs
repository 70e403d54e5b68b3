//! Sharded access to transaction logs of one client.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use log::{debug, info, warn};
use tessera_commons::{EntityType, ShardName};
use tessera_configs::{BatchSettings, ShardSettings};
use tessera_store::{
    wait_for_table_active, BackendError, BatchWriteOutcome, KeysAndAttributes, KeysByTable,
    TableBackend, WriteRequest, WriteRequestsByTable,
};
use tessera_system::{AddShardOutcome, ShardError, ShardManager, ShardProvisioner};

use super::transaction_log_models::TransactionLog;
use super::transaction_log_table::{
    decode_transaction_log, encode_transaction_log, transaction_log_key,
    transaction_log_table_definition,
};
use crate::error::{Result, TableError};

/// Rows fetched by [`TransactionLogModel::batch_get_items`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionLogReadResult {
    pub records: Vec<TransactionLog>,
    /// Lower-cased uuids still unread when the retry budget ran out.
    pub unprocessed: Vec<String>,
}

/// Transaction logs of one client, stored on the client's assigned shard.
pub struct TransactionLogModel {
    client_id: u64,
    manager: Arc<ShardManager>,
    write_chunk_size: usize,
    read_chunk_size: usize,
    table_ready_poll: Duration,
    table_ready_max_polls: u32,
}

impl TransactionLogModel {
    pub fn new(
        client_id: u64,
        manager: Arc<ShardManager>,
        batch: &BatchSettings,
        shards: &ShardSettings,
    ) -> Self {
        Self {
            client_id,
            manager,
            write_chunk_size: batch.write_chunk_size,
            read_chunk_size: batch.read_chunk_size,
            table_ready_poll: Duration::from_millis(shards.table_ready_poll_ms),
            table_ready_max_polls: shards.table_ready_max_polls,
        }
    }

    /// Override how long `create_shard` waits for a new table.
    pub fn with_table_ready_wait(mut self, poll: Duration, max_polls: u32) -> Self {
        self.table_ready_poll = poll;
        self.table_ready_max_polls = max_polls;
        self
    }

    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    fn shard_identifier(&self) -> String {
        self.client_id.to_string()
    }

    /// Create the physical table for `shard_name` and register it as a
    /// disabled transaction log shard.
    pub async fn create_shard(&self, shard_name: &str) -> Result<AddShardOutcome> {
        create_transaction_log_shard(
            &self.manager,
            shard_name,
            self.table_ready_poll,
            self.table_ready_max_polls,
        )
        .await
    }

    /// Write `records` to the client's shard, assigning one on first use.
    ///
    /// Records are split into chunks of `write_chunk_size` that run
    /// concurrently, each with its own retry loop. The returned outcomes are
    /// in chunk order.
    pub async fn batch_put_items(&self, records: &[TransactionLog]) -> Result<Vec<BatchWriteOutcome>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let shard = self
            .manager
            .assign_shard(&self.shard_identifier(), EntityType::TransactionLog)
            .await?;
        let table = shard.shard_name.to_string();

        let items = records
            .iter()
            .map(encode_transaction_log)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| TableError::codec("t_tl_put_1", e))?;

        let engine = self.manager.registry().engine();
        let chunks = items.chunks(self.write_chunk_size.max(1)).map(|chunk| {
            let mut request_items = WriteRequestsByTable::new();
            request_items.insert(
                table.clone(),
                chunk.iter().cloned().map(WriteRequest::put).collect(),
            );
            engine.write(request_items)
        });

        let outcomes = join_all(chunks)
            .await
            .into_iter()
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let unprocessed: usize = outcomes.iter().map(|o| o.unprocessed_count()).sum();
        if unprocessed > 0 {
            warn!(
                "{} of {} transaction logs for client {} were not written to {}",
                unprocessed,
                records.len(),
                self.client_id,
                table
            );
        } else {
            debug!(
                "Wrote {} transaction logs for client {} to {} in {} chunk(s)",
                records.len(),
                self.client_id,
                table,
                outcomes.len()
            );
        }
        Ok(outcomes)
    }

    /// Fetch transaction logs by uuid from the client's shard.
    ///
    /// Uuids are lower-cased and deduplicated. A client without an assigned
    /// shard has no rows, so nothing is read and nothing is assigned.
    pub async fn batch_get_items(&self, transaction_uuids: &[String]) -> Result<TransactionLogReadResult> {
        let mut seen = HashSet::new();
        let mut uuids = Vec::with_capacity(transaction_uuids.len());
        for uuid in transaction_uuids {
            let normalized = uuid.trim().to_lowercase();
            if normalized.is_empty() {
                return Err(TableError::validation("t_tl_get_1", "transaction uuid cannot be empty"));
            }
            if seen.insert(normalized.clone()) {
                uuids.push(normalized);
            }
        }
        if uuids.is_empty() {
            return Ok(TransactionLogReadResult::default());
        }

        let Some(shard) = self
            .manager
            .get_managed_shard(&self.shard_identifier(), EntityType::TransactionLog)
            .await?
        else {
            debug!("Client {} has no transaction log shard yet", self.client_id);
            return Ok(TransactionLogReadResult::default());
        };
        let table = shard.shard_name.to_string();

        let engine = self.manager.registry().engine();
        let mut requests = Vec::new();
        for chunk in uuids.chunks(self.read_chunk_size.max(1)) {
            let keys = chunk
                .iter()
                .map(|uuid| transaction_log_key(uuid))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| TableError::codec("t_tl_get_2", e))?;
            let mut request_keys = KeysByTable::new();
            request_keys.insert(table.clone(), KeysAndAttributes::new(keys));
            requests.push(engine.read(request_keys));
        }

        let mut result = TransactionLogReadResult::default();
        for outcome in join_all(requests).await {
            let mut outcome = outcome?;
            for item in outcome.responses.remove(&table).unwrap_or_default() {
                let record = decode_transaction_log(&item)
                    .map_err(|e| TableError::codec("t_tl_get_3", e))?;
                result.records.push(record);
            }
            if let Some(unprocessed) = outcome.unprocessed.remove(&table) {
                for key in unprocessed.keys {
                    if let Ok(record) = decode_transaction_log(&key) {
                        result.unprocessed.push(record.transaction_uuid);
                    }
                }
            }
        }

        if !result.unprocessed.is_empty() {
            warn!(
                "{} transaction logs for client {} could not be read from {}",
                result.unprocessed.len(),
                self.client_id,
                table
            );
        }
        Ok(result)
    }
}

/// Create the physical table of a transaction log shard and wait until it is
/// active. A table that already exists is reused.
async fn ensure_transaction_log_table(
    backend: &dyn TableBackend,
    shard_name: &ShardName,
    poll: Duration,
    max_polls: u32,
) -> tessera_system::Result<()> {
    let schema = transaction_log_table_definition(shard_name.as_str());
    match backend.create_table(&schema).await {
        Ok(description) => {
            info!("Created transaction log shard table {} ({})", shard_name, description.status)
        }
        Err(BackendError::ResourceInUse(_)) => {
            debug!("Transaction log shard table {} already exists", shard_name)
        }
        Err(source) => return Err(ShardError::backend("t_tl_shard_2", shard_name.as_str(), source)),
    }

    wait_for_table_active(backend, shard_name.as_str(), poll, max_polls)
        .await
        .map_err(|source| ShardError::backend("t_tl_shard_3", shard_name.as_str(), source))?;
    Ok(())
}

/// Create the physical table of a transaction log shard, wait until it is
/// active and register it as a disabled shard.
///
/// Nothing is registered when the table cannot be created, so an assignable
/// shard always has a table. Repeating a half-finished call is safe.
pub async fn create_transaction_log_shard(
    manager: &ShardManager,
    shard_name: &str,
    poll: Duration,
    max_polls: u32,
) -> Result<AddShardOutcome> {
    let shard_name = ShardName::new(shard_name)
        .map_err(|e| TableError::validation("t_tl_shard_1", e.to_string()))?;
    let backend = manager.registry().engine().backend().clone();
    ensure_transaction_log_table(backend.as_ref(), &shard_name, poll, max_polls).await?;

    Ok(manager
        .add_shard(shard_name.as_str(), EntityType::TransactionLog)
        .await?)
}

/// Creates transaction log shard tables for the shard migration, so default
/// shards are only registered once their table is active.
pub struct TransactionLogProvisioner {
    backend: Arc<dyn TableBackend>,
    poll: Duration,
    max_polls: u32,
}

impl TransactionLogProvisioner {
    pub fn new(backend: Arc<dyn TableBackend>, settings: &ShardSettings) -> Self {
        Self {
            backend,
            poll: Duration::from_millis(settings.table_ready_poll_ms),
            max_polls: settings.table_ready_max_polls,
        }
    }
}

#[async_trait]
impl ShardProvisioner for TransactionLogProvisioner {
    async fn provision(&self, shard_name: &ShardName) -> tessera_system::Result<()> {
        ensure_transaction_log_table(self.backend.as_ref(), shard_name, self.poll, self.max_polls).await
    }
}
