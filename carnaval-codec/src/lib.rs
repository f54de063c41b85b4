//! Schema-driven encode/decode engine for Carnaval domain types.
//!
//! - [`Schema`] / [`SchemaBuilder`] — which properties participate and how:
//!   selections, named and type-wide overrides, custom whole-object codecs,
//!   hooks and configuration
//! - [`Transform`] / [`Mapping`] — per-property overrides
//! - [`Codec`] — the async traversal engine
//! - [`Providers`] — named helpers passed to every transform and hook
//!
//! ```ignore
//! let schema = Schema::builder(&catalog, "Box")
//!     .select(["name", "things"])
//!     .map_property("name", Transform::new().alias("label"))
//!     .build()?;
//! let json = Codec::new(schema).encode_json(record).await?;
//! ```

mod codec;
mod config;
mod error;
mod normalize;
mod providers;
mod schema;
mod transform;

pub use codec::Codec;
pub use config::{CodecConfig, ParsePermissionsError, Permissions, UnknownKeys};
pub use error::{CodecError, CodecResult, SchemaError, SchemaResult};
pub use normalize::normalize;
pub use providers::Providers;
pub use schema::{CustomCodec, Draft, DraftFuture, Part, Schema, SchemaBuilder};
pub use transform::{
    Access, HookFuture, Mapping, Middleware, Selector, Transform, TransformFn, TransformFuture,
    TypeKey,
};
