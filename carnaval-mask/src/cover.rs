//! Visibility trees.

use crate::{Mask, MaskError, MaskResult};
use carnaval_types::FieldPath;
use std::collections::BTreeMap;

/// Which parts of a value a mask lets the source write.
///
/// Read from JSON as `true`, `false`, `{ "prop": <cover> }` or
/// `[<cover>]`. A property missing from a `Fields` cover is hidden.
#[derive(Debug, Clone, PartialEq)]
pub enum Cover {
    /// The whole value is writable.
    Visible,
    /// The value is compared, never written.
    Hidden,
    /// Per-property covers.
    Fields(BTreeMap<String, Cover>),
    /// The cover of every item of an array.
    Each(Box<Cover>),
    /// Settle the value with another mask.
    Mask(Mask),
}

impl Default for Cover {
    fn default() -> Self {
        Cover::Fields(BTreeMap::new())
    }
}

impl Cover {
    /// Builds a per-property cover from `(property, cover)` pairs.
    pub fn fields<K, C>(entries: impl IntoIterator<Item = (K, C)>) -> Self
    where
        K: Into<String>,
        C: Into<Cover>,
    {
        Cover::Fields(
            entries
                .into_iter()
                .map(|(key, cover)| (key.into(), cover.into()))
                .collect(),
        )
    }

    pub fn each(cover: impl Into<Cover>) -> Self {
        Cover::Each(Box::new(cover.into()))
    }

    /// A property is layered when its cover grants any write.
    pub fn is_layered(&self) -> bool {
        !matches!(self, Cover::Hidden)
    }

    /// The cover of one item when this cover applies to an array.
    pub fn item(&self) -> &Cover {
        match self {
            Cover::Each(inner) => inner.as_ref(),
            other => other,
        }
    }

    /// The cover a child property inherits.
    pub fn child(&self, name: &str) -> Cover {
        match self {
            Cover::Visible => Cover::Visible,
            Cover::Hidden => Cover::Hidden,
            Cover::Fields(fields) => fields.get(name).cloned().unwrap_or(Cover::Hidden),
            Cover::Each(inner) => inner.child(name),
            Cover::Mask(mask) => mask.layers().child(name),
        }
    }

    /// The explicit entry for `name`, without inheritance.
    pub(crate) fn entry(&self, name: &str) -> Option<&Cover> {
        match self {
            Cover::Fields(fields) => fields.get(name),
            Cover::Each(inner) => inner.entry(name),
            _ => None,
        }
    }

    /// Reads a cover from JSON.
    pub fn from_json(json: &serde_json::Value) -> MaskResult<Self> {
        read_cover(json, &FieldPath::root())
    }
}

fn read_cover(json: &serde_json::Value, path: &FieldPath) -> MaskResult<Cover> {
    match json {
        serde_json::Value::Bool(true) => Ok(Cover::Visible),
        serde_json::Value::Bool(false) => Ok(Cover::Hidden),
        serde_json::Value::Object(map) => {
            let mut fields = BTreeMap::new();
            for (key, value) in map {
                fields.insert(key.clone(), read_cover(value, &path.child(key))?);
            }
            Ok(Cover::Fields(fields))
        }
        serde_json::Value::Array(items) => match items.as_slice() {
            [item] => Ok(Cover::each(read_cover(item, &path.item(0))?)),
            _ => Err(MaskError::InvalidCover {
                path: path.to_string(),
                reason: format!("array covers take exactly one element, found {}", items.len()),
            }),
        },
        other => Err(MaskError::InvalidCover {
            path: path.to_string(),
            reason: format!("unexpected {other}"),
        }),
    }
}

impl From<bool> for Cover {
    fn from(visible: bool) -> Self {
        if visible { Cover::Visible } else { Cover::Hidden }
    }
}

impl From<Mask> for Cover {
    fn from(mask: Mask) -> Self {
        Cover::Mask(mask)
    }
}
