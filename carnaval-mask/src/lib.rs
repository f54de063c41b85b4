//! Write masks for Carnaval records.
//!
//! A [`Mask`] decides which properties of a type an untrusted source may
//! write into a trusted destination. [`Mask::settle`] copies the visible
//! ("layered") properties and compares the others, returning a [`Touched`]
//! report of every protected property the source tried to change.
//!
//! - [`Cover`] — the visibility tree (`true` / `false` / per-field / per-item
//!   / delegate to another mask)
//! - [`Mask::with`] — an inclusion list
//! - [`Mask::except`] — everything but the excluded properties

mod cover;
mod error;
mod mask;
mod touched;

pub use cover::Cover;
pub use error::{MaskError, MaskResult};
pub use mask::Mask;
pub use touched::Touched;
