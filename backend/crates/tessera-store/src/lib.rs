//! # tessera-store
//!
//! Client-side view of the backing table service plus the batch retry engine
//! that drives partially-applied batch calls to completion.
//!
//! ## Architecture
//!
//! ```text
//! tessera-system / tessera-tables (shard bookkeeping, record models)
//!     ↓
//! tessera-store::batch (BatchRetryEngine, BatchWrite, BatchGet)
//!     ↓
//! TableBackend (InMemoryBackend | HttpBackend, selected by BackendProvider)
//! ```
//!
//! Every backend call is async. A batch primitive may apply only part of a
//! request and hand back the rest as unprocessed; the engine resubmits that
//! remainder with a linear backoff until it drains or the retry budget runs out.

pub mod backend_trait;
pub mod backends;
pub mod batch;
pub mod error;
pub mod provider;
pub mod types;

pub mod test_utils;

pub use backend_trait::{table_exists, wait_for_table_active, TableBackend, TableExistence};
pub use backends::{HttpBackend, HttpBackendConfig, InMemoryBackend};
pub use batch::{
    BatchGet, BatchOperation, BatchReadOutcome, BatchRetryEngine, BatchWrite, BatchWriteOutcome,
    CancellationToken, RetryPolicy,
};
pub use error::{BackendError, Result, StoreError};
pub use provider::{BackendProvider, EndpointPreference};
pub use types::{
    BatchGetOutput, BatchWriteOutput, Condition, GlobalSecondaryIndex, KeyAttribute,
    KeysAndAttributes, KeysByTable, PutItemRequest, QueryRequest, ScalarType, TableDescription,
    TableSchema, TableStatus, WriteRequest, WriteRequestsByTable,
};
