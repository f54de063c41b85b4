//! Domain type declarations for Carnaval.
//!
//! Defines the contract every mapping engine consumes:
//! - [`Descriptor`] — the declared kind of one property (primitive, reference,
//!   literal shape, or array of those)
//! - [`Props`] — the ordered property declaration of a type
//! - [`DomainType`] / [`Domain`] — a named type and its declaration
//! - [`Catalog`] — the immutable registry resolving type names, and the
//!   construction/assignment entry point producing [`carnaval_types::Record`]s
//!
//! Catalogs are validated when built: every reference resolves, so the
//! engines never meet a dangling type at encode/decode time.

mod catalog;
mod descriptor;
mod error;

pub use catalog::{Catalog, CatalogBuilder, Domain, DomainType};
pub use descriptor::{Descriptor, Kind, Props};
pub use error::{ModelError, ModelResult};
