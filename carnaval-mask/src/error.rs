//! Error types for mask construction.

use thiserror::Error;

/// Result type for mask construction.
pub type MaskResult<T> = Result<T, MaskError>;

/// Errors raised while building a [`crate::Mask`] or reading a [`crate::Cover`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaskError {
    /// The covered type is not registered.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// A cover names a property the type does not declare.
    #[error("type '{type_name}' has no property '{property}'")]
    UnknownProperty { type_name: String, property: String },

    /// A cover does not fit the property it is attached to.
    #[error("incompatible cover for '{property}': {reason}")]
    IncompatibleCover { property: String, reason: String },

    /// A JSON document could not be read as a cover.
    #[error("invalid cover at '{path}': {reason}")]
    InvalidCover { path: String, reason: String },
}
