//! Error types for schema construction and the codec engine.

use carnaval_model::ModelError;
use thiserror::Error;

/// Result type for schema construction.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for encode/decode operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while building a [`crate::Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The target type is not registered.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// A property name is not declared on the type.
    #[error("type '{type_name}' has no property '{property}'")]
    UnknownProperty { type_name: String, property: String },

    /// A mapping does not fit the property it is attached to.
    #[error("incompatible mapping for '{property}': {reason}")]
    IncompatibleMapping { property: String, reason: String },

    /// The same property was selected twice.
    #[error("property selected twice: {0}")]
    DuplicateSelection(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Errors raised while encoding or decoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// A value does not have the shape its declaration requires.
    #[error("{path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// An input key matches no declared property.
    #[error("{path}: unknown key '{key}'")]
    UnknownKey { path: String, key: String },

    /// A transform or hook asked for a provider that is not registered.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// A user transform, hook or provider failed.
    #[error("transform failed: {message}")]
    Transform { message: String },

    /// A validation hook rejected the value.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl CodecError {
    /// Shorthand for a user-level failure.
    pub fn transform(message: impl Into<String>) -> Self {
        CodecError::Transform {
            message: message.into(),
        }
    }
}
