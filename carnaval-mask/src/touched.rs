//! Conflict reports.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::collections::BTreeMap;

/// Schema-shaped report of the protected properties a source tried to change.
///
/// Serializes as `true`, `false`, an object of reports or an array of
/// reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Touched {
    Changed,
    Unchanged,
    Fields(BTreeMap<String, Touched>),
    Items(Vec<Touched>),
}

impl Default for Touched {
    fn default() -> Self {
        Touched::Fields(BTreeMap::new())
    }
}

impl Touched {
    /// True when nothing was reported.
    pub fn is_empty(&self) -> bool {
        match self {
            Touched::Unchanged => true,
            Touched::Fields(fields) => fields.is_empty(),
            Touched::Changed | Touched::Items(_) => false,
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, Touched::Changed)
    }

    /// Report of one property.
    pub fn get(&self, key: &str) -> Option<&Touched> {
        match self {
            Touched::Fields(fields) => fields.get(key),
            _ => None,
        }
    }

    /// Report of one array position.
    pub fn index(&self, index: usize) -> Option<&Touched> {
        match self {
            Touched::Items(items) => items.get(index),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Touched::Changed => serde_json::Value::Bool(true),
            Touched::Unchanged => serde_json::Value::Bool(false),
            Touched::Fields(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(key, touched)| (key.clone(), touched.to_json()))
                    .collect(),
            ),
            Touched::Items(items) => {
                serde_json::Value::Array(items.iter().map(Touched::to_json).collect())
            }
        }
    }
}

impl Serialize for Touched {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Touched::Changed => serializer.serialize_bool(true),
            Touched::Unchanged => serializer.serialize_bool(false),
            Touched::Fields(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, touched) in fields {
                    map.serialize_entry(key, touched)?;
                }
                map.end()
            }
            Touched::Items(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for touched in items {
                    seq.serialize_element(touched)?;
                }
                seq.end()
            }
        }
    }
}
