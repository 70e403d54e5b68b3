//! Shared error types for Tessera.
//!
//! `ErrorCategory` is the machine-readable classification every crate-level
//! error maps onto, so callers can branch on the kind of failure without
//! matching on crate-specific enums.

use std::fmt;

use thiserror::Error;

/// Machine-readable failure category carried by every Tessera error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed or missing input. Never retried.
    Validation,
    /// A backend resource was missing.
    NotFound,
    /// Any other backend failure that aborts the operation.
    BackendFatal,
    /// No reserve shard is left for an entity type.
    CapacityExhausted,
    /// A concurrent writer won a conditional update.
    Conflict,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::BackendFatal => "backend_fatal",
            ErrorCategory::CapacityExhausted => "capacity_exhausted",
            ErrorCategory::Conflict => "conflict",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while parsing shared model values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommonError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown entity type '{0}'")]
    UnknownEntityType(String),

    #[error("Unknown allocation type '{0}'")]
    UnknownAllocationType(String),
}

impl CommonError {
    pub fn internal_id(&self) -> &'static str {
        match self {
            CommonError::InvalidInput(_) => "c_invalid_input",
            CommonError::UnknownEntityType(_) => "c_unknown_entity_type",
            CommonError::UnknownAllocationType(_) => "c_unknown_allocation_type",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }
}

/// Result type for shared model parsing.
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors raised by the record codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Invalid number '{value}' for field '{field}'")]
    InvalidNumber { field: String, value: String },

    #[error("Missing required field '{0}'")]
    MissingField(String),

    #[error("Field '{field}' expected {expected} but found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid value for field '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl CodecError {
    pub fn internal_id(&self) -> &'static str {
        match self {
            CodecError::UnknownField(_) => "c_codec_unknown_field",
            CodecError::InvalidNumber { .. } => "c_codec_invalid_number",
            CodecError::MissingField(_) => "c_codec_missing_field",
            CodecError::TypeMismatch { .. } => "c_codec_type_mismatch",
            CodecError::InvalidValue { .. } => "c_codec_invalid_value",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_strings() {
        assert_eq!(ErrorCategory::CapacityExhausted.to_string(), "capacity_exhausted");
        assert_eq!(ErrorCategory::BackendFatal.as_str(), "backend_fatal");
    }

    #[test]
    fn test_codec_error_display() {
        let err = CodecError::InvalidNumber {
            field: "amount".to_string(),
            value: "12a".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid number '12a' for field 'amount'");
        assert_eq!(err.category(), ErrorCategory::Validation);
    }
}
