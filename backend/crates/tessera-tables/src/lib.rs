//! # tessera-tables
//!
//! Logical record models stored on sharded physical tables.
//!
//! A model resolves the shard for its sharding key through
//! [`tessera_system::ShardManager`], materializes records with the compact
//! codec from `tessera-commons`, and drives bulk reads and writes through the
//! batch engine from `tessera-store`.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use tessera_tables::{TransactionLog, TransactionLogModel};
//!
//! let model = TransactionLogModel::new(42, manager.clone(), &config.batch, &config.shards);
//! model.create_shard("tl_shard_1").await?;
//! let outcomes = model.batch_put_items(&[TransactionLog::new("0f1e-...")]).await?;
//! ```

pub mod error;
pub mod transaction_logs;

pub use error::{Result, TableError};
pub use transaction_logs::{
    create_transaction_log_shard, transaction_log_table_definition, ChainType, TransactionLog,
    TransactionLogModel, TransactionLogProvisioner, TransactionLogReadResult, TransactionStatus,
    TransactionType, TransferEvent, TRANSACTION_HASH_INDEX, TRANSACTION_LOG_NAMES,
};
