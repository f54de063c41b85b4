//! Typed instances.

use crate::{Map, TypeName, Value};
use serde::{Serialize, Serializer};

/// A typed instance of a domain type.
///
/// A record is a field map tagged with the name of the domain type it was
/// constructed as. Fields beyond the type's declaration are allowed (hooks
/// may attach derived values); the construction contract in
/// `carnaval-model` only ever fills declared properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_name: TypeName,
    fields: Map,
}

impl Record {
    /// Creates an empty record of the given type.
    #[must_use]
    pub fn new(type_name: impl Into<TypeName>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Map::new(),
        }
    }

    /// Creates a record from an existing field map.
    #[must_use]
    pub fn with_fields(type_name: impl Into<TypeName>, fields: Map) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }

    /// Builder-style field assignment.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns the name of the record's type.
    #[must_use]
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Returns true if the record was constructed as the given type.
    #[must_use]
    pub fn is_a(&self, type_name: &str) -> bool {
        self.type_name == type_name
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns a mutable field value.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields.get_mut(key)
    }

    /// Sets a field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// Returns true if the field is present (possibly null).
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Returns the field map.
    #[must_use]
    pub fn fields(&self) -> &Map {
        &self.fields
    }

    /// Returns the mutable field map.
    pub fn fields_mut(&mut self) -> &mut Map {
        &mut self.fields
    }

    /// Consumes the record and returns its field map.
    #[must_use]
    pub fn into_fields(self) -> Map {
        self.fields
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}
