//! `TableBackend` implementations.

mod http;
mod memory;

pub use http::{HttpBackend, HttpBackendConfig};
pub use memory::InMemoryBackend;

/// Service limits on write requests per `batch_write` and keys per `batch_get`.
pub use tessera_configs::defaults::{MAX_BATCH_GET_KEYS, MAX_BATCH_WRITE_ITEMS};
