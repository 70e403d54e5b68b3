use super::defaults::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main Tessera configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TesseraConfig {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub batch: BatchSettings,
    #[serde(default)]
    pub shards: ShardSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Backing table service connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// "memory" (process-local tables) or "http" (DynamoDB JSON protocol)
    #[serde(default = "default_backend_kind")]
    pub kind: String,

    /// Raw endpoint. Always used for control-plane calls, and the fallback
    /// for data-plane calls when no accelerated endpoint is configured.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Preferred endpoint for data-plane calls (e.g. a caching cluster)
    #[serde(default)]
    pub accelerated_endpoint: Option<String>,

    /// Route data-plane calls to `accelerated_endpoint` when it is set
    #[serde(default = "default_true")]
    pub prefer_accelerated: bool,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_access_key_id")]
    pub access_key_id: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            kind: default_backend_kind(),
            endpoint: default_endpoint(),
            accelerated_endpoint: None,
            prefer_accelerated: true,
            region: default_region(),
            access_key_id: default_access_key_id(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Batch retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSettings {
    /// Retries after the first attempt for unprocessed items/keys
    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: u32,

    /// Constant term of the write backoff (ms)
    #[serde(default = "default_fixed_retry_after_ms")]
    pub fixed_retry_after_ms: u64,

    /// Per-attempt term of the write backoff (ms)
    #[serde(default = "default_variable_retry_after_ms")]
    pub variable_retry_after_ms: u64,

    /// Per-attempt read backoff (ms)
    #[serde(default = "default_read_retry_step_ms")]
    pub read_retry_step_ms: u64,

    #[serde(default = "default_write_chunk_size")]
    pub write_chunk_size: usize,

    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_retry_count: default_max_retry_count(),
            fixed_retry_after_ms: default_fixed_retry_after_ms(),
            variable_retry_after_ms: default_variable_retry_after_ms(),
            read_retry_step_ms: default_read_retry_step_ms(),
            write_chunk_size: default_write_chunk_size(),
            read_chunk_size: default_read_chunk_size(),
        }
    }
}

/// Shard registry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardSettings {
    #[serde(default = "default_available_shards_table")]
    pub available_shards_table: String,

    #[serde(default = "default_managed_shards_table")]
    pub managed_shards_table: String,

    /// Delay between table status probes while waiting for a table to turn active
    #[serde(default = "default_table_ready_poll_ms")]
    pub table_ready_poll_ms: u64,

    #[serde(default = "default_table_ready_max_polls")]
    pub table_ready_max_polls: u32,

    /// Shards registered by migration, keyed by entity type
    /// (e.g. `transactionLog = ["tl_shard_1"]`)
    #[serde(default)]
    pub defaults: HashMap<String, Vec<String>>,
}

impl Default for ShardSettings {
    fn default() -> Self {
        Self {
            available_shards_table: default_available_shards_table(),
            managed_shards_table: default_managed_shards_table(),
            table_ready_poll_ms: default_table_ready_poll_ms(),
            table_ready_max_polls: default_table_ready_max_polls(),
            defaults: HashMap::new(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "compact" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,

    #[serde(default = "default_true")]
    pub log_to_console: bool,

    #[serde(default = "default_logs_path")]
    pub logs_path: String,

    /// Per-target level overrides, e.g. `tessera_store = "debug"`
    #[serde(default)]
    pub targets: HashMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_to_console: true,
            logs_path: default_logs_path(),
            targets: HashMap::new(),
        }
    }
}
