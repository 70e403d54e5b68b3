use tessera_commons::{CodecError, CommonError, EntityType, ErrorCategory, ShardName};
use tessera_store::{BackendError, StoreError};
use thiserror::Error;

/// Errors raised by shard bookkeeping.
#[derive(Error, Debug, Clone)]
pub enum ShardError {
    /// Malformed input. Never retried.
    #[error("[{id}] {message}")]
    Validation { id: &'static str, message: String },

    #[error("[{id}] shard {shard_name} is registered for {existing}, cannot register it for {requested}")]
    ShardConflict {
        id: &'static str,
        shard_name: ShardName,
        existing: EntityType,
        requested: EntityType,
    },

    /// No disabled shard is left; an operator has to add shards.
    #[error("[{id}] no disabled shard available for {entity_type} (identifier {identifier})")]
    CapacityExhausted {
        id: &'static str,
        entity_type: EntityType,
        identifier: String,
    },

    #[error("[{id}] backend call on {table} failed: {source}")]
    Backend {
        id: &'static str,
        table: String,
        #[source]
        source: BackendError,
    },

    #[error("{0}")]
    Store(#[from] StoreError),

    /// A stored row could not be decoded.
    #[error("[{id}] invalid row in {table}: {source}")]
    Codec {
        id: &'static str,
        table: String,
        #[source]
        source: CodecError,
    },

    #[error("[{id}] shard migration failed: {message}")]
    Migration { id: &'static str, message: String },
}

impl ShardError {
    pub fn validation(id: &'static str, message: impl Into<String>) -> Self {
        ShardError::Validation {
            id,
            message: message.into(),
        }
    }

    pub fn backend(id: &'static str, table: impl Into<String>, source: BackendError) -> Self {
        ShardError::Backend {
            id,
            table: table.into(),
            source,
        }
    }

    pub fn internal_id(&self) -> &'static str {
        match self {
            ShardError::Validation { id, .. }
            | ShardError::ShardConflict { id, .. }
            | ShardError::CapacityExhausted { id, .. }
            | ShardError::Backend { id, .. }
            | ShardError::Codec { id, .. }
            | ShardError::Migration { id, .. } => id,
            ShardError::Store(err) => err.internal_id(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ShardError::Validation { .. } => ErrorCategory::Validation,
            ShardError::ShardConflict { .. } => ErrorCategory::Conflict,
            ShardError::CapacityExhausted { .. } => ErrorCategory::CapacityExhausted,
            ShardError::Backend { source, .. } => source.category(),
            ShardError::Store(err) => err.category(),
            ShardError::Codec { .. } | ShardError::Migration { .. } => ErrorCategory::BackendFatal,
        }
    }
}

impl From<CommonError> for ShardError {
    fn from(err: CommonError) -> Self {
        ShardError::Validation {
            id: err.internal_id(),
            message: err.to_string(),
        }
    }
}

/// Result type for shard operations.
pub type Result<T> = std::result::Result<T, ShardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let err = ShardError::CapacityExhausted {
            id: "sh_assign_2",
            entity_type: EntityType::TokenBalance,
            identifier: "client1".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::CapacityExhausted);
        assert!(err.to_string().contains("tokenBalance"));

        let err: ShardError = CommonError::UnknownEntityType("balances".to_string()).into();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.internal_id(), "c_unknown_entity_type");
    }
}
