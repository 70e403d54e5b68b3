//! Error types for backend calls and batch execution.

use tessera_commons::ErrorCategory;
use thiserror::Error;

/// Raw failure signal from the backing table service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Table or index does not exist (or is not active yet).
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Table already exists or is being modified.
    #[error("Resource in use: {0}")]
    ResourceInUse(String),

    /// Request rejected as malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A conditional write lost against the stored row.
    #[error("Conditional check failed: {0}")]
    ConditionalCheckFailed(String),

    #[error("Throttled: {0}")]
    Throttled(String),

    /// Connection, timeout or body decoding failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Any other service-reported error.
    #[error("Service error {code}: {message}")]
    Service { code: String, message: String },
}

impl BackendError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::ResourceNotFound(_))
    }

    pub fn is_conditional_check_failed(&self) -> bool {
        matches!(self, BackendError::ConditionalCheckFailed(_))
    }

    /// Whether a client may resend the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Throttled(_) | BackendError::Transport(_))
    }

    pub fn internal_id(&self) -> &'static str {
        match self {
            BackendError::ResourceNotFound(_) => "s_backend_not_found",
            BackendError::ResourceInUse(_) => "s_backend_in_use",
            BackendError::Validation(_) => "s_backend_validation",
            BackendError::ConditionalCheckFailed(_) => "s_backend_condition",
            BackendError::Throttled(_) => "s_backend_throttled",
            BackendError::Transport(_) => "s_backend_transport",
            BackendError::Service { .. } => "s_backend_service",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            BackendError::ResourceNotFound(_) => ErrorCategory::NotFound,
            BackendError::Validation(_) => ErrorCategory::Validation,
            BackendError::ConditionalCheckFailed(_) => ErrorCategory::Conflict,
            _ => ErrorCategory::BackendFatal,
        }
    }

    /// Map a service error type (e.g. `com.amazonaws.dynamodb.v20120810#ResourceNotFoundException`)
    /// onto a variant.
    pub fn from_service(error_type: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let code = error_type.rsplit('#').next().unwrap_or(error_type);
        match code {
            "ResourceNotFoundException" => BackendError::ResourceNotFound(message),
            "ResourceInUseException" => BackendError::ResourceInUse(message),
            "ValidationException" | "SerializationException" => BackendError::Validation(message),
            "ConditionalCheckFailedException" => BackendError::ConditionalCheckFailed(message),
            "ProvisionedThroughputExceededException"
            | "ThrottlingException"
            | "RequestLimitExceeded" => BackendError::Throttled(message),
            other => BackendError::Service {
                code: other.to_string(),
                message,
            },
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Transport(err.to_string())
    }
}

/// Errors surfaced by batch execution and other store-level operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Malformed request, rejected before any backend call.
    #[error("[{id}] {message}")]
    Validation { id: &'static str, message: String },

    /// Non-retryable backend failure that aborted the operation.
    #[error("[{id}] backend call failed for {table} on attempt {attempt}: {source}")]
    Backend {
        id: &'static str,
        table: String,
        attempt: u32,
        #[source]
        source: BackendError,
    },
}

impl StoreError {
    pub fn validation(id: &'static str, message: impl Into<String>) -> Self {
        StoreError::Validation {
            id,
            message: message.into(),
        }
    }

    pub fn internal_id(&self) -> &'static str {
        match self {
            StoreError::Validation { id, .. } | StoreError::Backend { id, .. } => id,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            StoreError::Validation { .. } => ErrorCategory::Validation,
            StoreError::Backend { source, .. } => match source.category() {
                ErrorCategory::NotFound | ErrorCategory::Conflict => ErrorCategory::BackendFatal,
                other => other,
            },
        }
    }

    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            StoreError::Backend { source, .. } => Some(source),
            StoreError::Validation { .. } => None,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_service_strips_namespace() {
        let err = BackendError::from_service(
            "com.amazonaws.dynamodb.v20120810#ResourceNotFoundException",
            "Requested resource not found",
        );
        assert!(err.is_not_found());
        assert_eq!(err.category(), ErrorCategory::NotFound);

        let err = BackendError::from_service("ThrottlingException", "slow down");
        assert!(err.is_retryable());

        let err = BackendError::from_service("AccessDeniedException", "no");
        assert_eq!(
            err,
            BackendError::Service {
                code: "AccessDeniedException".to_string(),
                message: "no".to_string()
            }
        );
    }

    #[test]
    fn test_store_error_context() {
        let err = StoreError::Backend {
            id: "s_bw_execute_1",
            table: "tl_shard_1".to_string(),
            attempt: 2,
            source: BackendError::Validation("bad key".to_string()),
        };
        assert_eq!(err.internal_id(), "s_bw_execute_1");
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(err.to_string().contains("tl_shard_1"));
        assert!(err.to_string().contains("attempt 2"));
    }
}
