//! Error types for the model layer.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while declaring or resolving domain types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The type is not registered in the catalog.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// A type with the same name was registered twice.
    #[error("type already registered: {0}")]
    DuplicateType(String),

    /// A property references a type missing from the catalog.
    #[error("type '{owner}' references unknown type '{target}' at '{property}'")]
    DanglingReference {
        owner: String,
        property: String,
        target: String,
    },

    /// A JSON declaration could not be read as a descriptor.
    #[error("invalid declaration at '{path}': {reason}")]
    InvalidDeclaration { path: String, reason: String },

    /// Instances can only be built from objects or records.
    #[error("cannot instantiate '{type_name}' from {found}")]
    NotAnObject {
        type_name: String,
        found: &'static str,
    },
}
