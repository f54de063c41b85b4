//! Core value types for Carnaval.
//!
//! This crate defines the in-memory representation every other crate
//! walks over:
//! - [`Value`] — a JSON-compatible tree extended with dates and typed records
//! - [`Record`] — a typed instance: a [`TypeName`] plus its field map
//! - [`FieldPath`] — the location of a value inside a tree, used in errors
//!
//! Nothing here knows about schemas; declarations live in `carnaval-model`.

mod name;
mod path;
mod record;
mod value;

pub use name::TypeName;
pub use path::{FieldPath, PathSegment};
pub use record::Record;
pub use value::{Map, Value};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in value operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid date: {0}")]
    InvalidDate(String),
}
