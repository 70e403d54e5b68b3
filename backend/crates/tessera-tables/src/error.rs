use tessera_commons::{CodecError, ErrorCategory};
use tessera_store::{BackendError, StoreError};
use tessera_system::ShardError;
use thiserror::Error;

/// Errors raised by logical record models.
#[derive(Error, Debug, Clone)]
pub enum TableError {
    #[error("[{id}] {message}")]
    Validation { id: &'static str, message: String },

    #[error("[{id}] record encoding failed: {source}")]
    Codec {
        id: &'static str,
        #[source]
        source: CodecError,
    },

    #[error("[{id}] backend call on {table} failed: {source}")]
    Backend {
        id: &'static str,
        table: String,
        #[source]
        source: BackendError,
    },

    #[error("{0}")]
    Shard(#[from] ShardError),

    #[error("{0}")]
    Store(#[from] StoreError),
}

impl TableError {
    pub fn validation(id: &'static str, message: impl Into<String>) -> Self {
        TableError::Validation {
            id,
            message: message.into(),
        }
    }

    pub fn codec(id: &'static str, source: CodecError) -> Self {
        TableError::Codec { id, source }
    }

    pub fn internal_id(&self) -> &'static str {
        match self {
            TableError::Validation { id, .. }
            | TableError::Codec { id, .. }
            | TableError::Backend { id, .. } => id,
            TableError::Shard(err) => err.internal_id(),
            TableError::Store(err) => err.internal_id(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            TableError::Validation { .. } | TableError::Codec { .. } => ErrorCategory::Validation,
            TableError::Backend { source, .. } => source.category(),
            TableError::Shard(err) => err.category(),
            TableError::Store(err) => err.category(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TableError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let err = TableError::codec("t_tl_encode_1", CodecError::UnknownField("x".into()));
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.internal_id(), "t_tl_encode_1");

        let err = TableError::Backend {
            id: "t_tl_shard_1",
            table: "tl_shard_1".into(),
            source: BackendError::ResourceNotFound("tl_shard_1".into()),
        };
        assert_eq!(err.category(), ErrorCategory::NotFound);

        let err: TableError = ShardError::validation("sh_assign_1", "identifier cannot be empty").into();
        assert_eq!(err.internal_id(), "sh_assign_1");
        assert_eq!(err.category(), ErrorCategory::Validation);
    }
}
