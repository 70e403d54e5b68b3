//! Transaction logs, sharded per client.
//!
//! - `transaction_log_models`: the typed record and its enum vocabularies
//! - `transaction_log_table`: short-name vocabulary, row codec and shard schema
//! - `transaction_log_model`: shard resolution plus batched reads and writes

pub mod transaction_log_model;
pub mod transaction_log_models;
pub mod transaction_log_table;

pub use transaction_log_model::{
    create_transaction_log_shard, TransactionLogModel, TransactionLogProvisioner,
    TransactionLogReadResult,
};
pub use transaction_log_models::{
    ChainType, TransactionLog, TransactionStatus, TransactionType, TransferEvent,
};
pub use transaction_log_table::{
    decode_transaction_log, encode_transaction_log, transaction_log_key,
    transaction_log_table_definition, TRANSACTION_HASH_INDEX, TRANSACTION_LOG_NAMES,
};
