//! Record validators for Carnaval.
//!
//! A [`Validate`] implementation checks a decoded [`Record`]; [`middleware`]
//! turns any validator into an `after_decode` hook so a failing record
//! rejects the decode with a path-bearing message.
//!
//! Two validators ship with the crate:
//! - [`RuleValidator`] walks the catalog declaration and a [`RuleSet`]
//! - [`JsonSchemaValidator`] derives a JSON Schema document from the same
//!   inputs and checks the record's JSON form with `jsonschema`

mod error;
mod json_schema;
mod rules;

pub use error::{ValidationError, ValidationResult};
pub use json_schema::JsonSchemaValidator;
pub use rules::{RuleSet, RuleValidator, Rules};

use carnaval_codec::{CodecError, Middleware};
use carnaval_types::Record;
use tracing::debug;

/// Checks a record.
pub trait Validate {
    fn validate(&self, record: &Record) -> ValidationResult<()>;
}

impl<F> Validate for F
where
    F: Fn(&Record) -> ValidationResult<()>,
{
    fn validate(&self, record: &Record) -> ValidationResult<()> {
        self(record)
    }
}

/// Adapts a validator to an `after_decode` hook.
///
/// The hook leaves valid records untouched and fails the decode with
/// [`CodecError::Validation`] otherwise.
pub fn middleware<V>(validator: V) -> Middleware
where
    V: Validate + Send + Sync + 'static,
{
    Middleware::new(move |current, _, _| {
        let record = current.as_record().ok_or_else(|| {
            CodecError::Validation(format!("expected a record, found {}", current.type_label()))
        })?;
        validator.validate(record).map_err(|e| {
            debug!(type_name = %record.type_name(), error = %e, "record rejected");
            CodecError::from(e)
        })?;
        Ok(None)
    })
}
