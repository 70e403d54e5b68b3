// Default value functions

pub fn default_true() -> bool {
    true
}

pub fn default_backend_kind() -> String {
    "memory".to_string()
}

pub fn default_endpoint() -> String {
    "http://127.0.0.1:8000".to_string()
}

pub fn default_region() -> String {
    "us-east-1".to_string()
}

pub fn default_access_key_id() -> String {
    "local".to_string()
}

pub fn default_request_timeout_ms() -> u64 {
    5000
}

pub fn default_max_retry_count() -> u32 {
    10
}

pub fn default_fixed_retry_after_ms() -> u64 {
    25
}

pub fn default_variable_retry_after_ms() -> u64 {
    25
}

pub fn default_read_retry_step_ms() -> u64 {
    300
}

/// Backend limit on items per batch write request.
pub const MAX_BATCH_WRITE_ITEMS: usize = 25;

/// Backend limit on keys per batch get request.
pub const MAX_BATCH_GET_KEYS: usize = 100;

pub fn default_write_chunk_size() -> usize {
    MAX_BATCH_WRITE_ITEMS
}

pub fn default_read_chunk_size() -> usize {
    MAX_BATCH_GET_KEYS
}

pub fn default_available_shards_table() -> String {
    "available_shards".to_string()
}

pub fn default_managed_shards_table() -> String {
    "managed_shards".to_string()
}

pub fn default_table_ready_poll_ms() -> u64 {
    500
}

pub fn default_table_ready_max_polls() -> u32 {
    60
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_log_format() -> String {
    "compact".to_string()
}

pub fn default_logs_path() -> String {
    "./logs".to_string()
}
