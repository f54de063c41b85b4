//! Error types for validation.

use carnaval_codec::CodecError;
use thiserror::Error;

/// Result type for validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Why a record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required value is absent, null or an empty string.
    #[error("{path} is required")]
    Required { path: String },

    /// A value does not match its declared type.
    #[error("{path} should be {expected}")]
    WrongType { path: String, expected: String },

    /// An array holds more items than allowed.
    #[error("{path} should not have more than {max} items")]
    TooMany { path: String, max: usize },

    /// An array holds fewer items than required.
    #[error("{path} should not have fewer than {min} items")]
    TooFew { path: String, min: usize },

    /// Any other schema violation, or a schema that could not be compiled.
    #[error("{message}")]
    Schema { message: String },
}

impl From<ValidationError> for CodecError {
    fn from(error: ValidationError) -> Self {
        CodecError::Validation(error.to_string())
    }
}
