//! Type descriptors and property declarations.
//!
//! A descriptor is a closed tagged union resolved once, when a type is
//! declared. Declarations can also be written as JSON:
//!
//! ```json
//! { "name": "string", "thing": "Thing", "tags": ["string"], "meta": { "more": "boolean" } }
//! ```
//!
//! `"string" | "number" | "boolean" | "date" | "object"` are primitives, any
//! other string names a domain type, an object is a literal shape and a
//! one-element array wraps its element descriptor.

use crate::{ModelError, ModelResult};
use carnaval_types::{FieldPath, TypeName};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Primitive property kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    String,
    Number,
    Boolean,
    Date,
    /// Opaque value, copied as-is.
    Object,
}

impl Kind {
    /// Returns the declaration keyword for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::Number => "number",
            Kind::Boolean => "boolean",
            Kind::Date => "date",
            Kind::Object => "object",
        }
    }

    /// Parses a declaration keyword.
    pub fn parse(keyword: &str) -> Option<Kind> {
        match keyword {
            "string" => Some(Kind::String),
            "number" => Some(Kind::Number),
            "boolean" => Some(Kind::Boolean),
            "date" => Some(Kind::Date),
            "object" => Some(Kind::Object),
            _ => None,
        }
    }
}

/// The declared kind of a single property.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    /// A primitive value.
    Primitive(Kind),
    /// A nested instance of another domain type.
    Reference(TypeName),
    /// An inline nested shape producing plain objects.
    Literal(Props),
    /// A sequence of values of one element descriptor.
    Array(Box<Descriptor>),
}

impl Descriptor {
    pub fn string() -> Self {
        Descriptor::Primitive(Kind::String)
    }

    pub fn number() -> Self {
        Descriptor::Primitive(Kind::Number)
    }

    pub fn boolean() -> Self {
        Descriptor::Primitive(Kind::Boolean)
    }

    pub fn date() -> Self {
        Descriptor::Primitive(Kind::Date)
    }

    pub fn object() -> Self {
        Descriptor::Primitive(Kind::Object)
    }

    pub fn reference(type_name: impl Into<TypeName>) -> Self {
        Descriptor::Reference(type_name.into())
    }

    pub fn literal(props: Props) -> Self {
        Descriptor::Literal(props)
    }

    pub fn array_of(element: Descriptor) -> Self {
        Descriptor::Array(Box::new(element))
    }

    /// Returns the element descriptor with all array wrappers removed.
    pub fn element(&self) -> &Descriptor {
        match self {
            Descriptor::Array(inner) => inner.element(),
            other => other,
        }
    }

    /// Returns true if this descriptor is array-shaped.
    pub fn is_array(&self) -> bool {
        matches!(self, Descriptor::Array(_))
    }

    /// Returns the primitive kind, if any.
    pub fn kind(&self) -> Option<Kind> {
        match self {
            Descriptor::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Short label used in validation messages (`"string"`, `"Thing"`, `"array"`...).
    pub fn label(&self) -> String {
        match self {
            Descriptor::Primitive(kind) => kind.as_str().to_string(),
            Descriptor::Reference(name) => name.to_string(),
            Descriptor::Literal(_) => "object".to_string(),
            Descriptor::Array(_) => "array".to_string(),
        }
    }

    /// Reads a descriptor from its JSON declaration.
    pub fn from_json(json: &serde_json::Value) -> ModelResult<Self> {
        read_descriptor(json, &FieldPath::root())
    }

    /// Renders the JSON declaration of this descriptor.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Descriptor::Primitive(kind) => serde_json::Value::from(kind.as_str()),
            Descriptor::Reference(name) => serde_json::Value::from(name.as_str()),
            Descriptor::Literal(props) => props.to_json(),
            Descriptor::Array(inner) => serde_json::Value::Array(vec![inner.to_json()]),
        }
    }
}

fn read_descriptor(json: &serde_json::Value, path: &FieldPath) -> ModelResult<Descriptor> {
    match json {
        serde_json::Value::String(keyword) if keyword.is_empty() => {
            Err(invalid(path, "empty type name"))
        }
        serde_json::Value::String(keyword) => Ok(Kind::parse(keyword)
            .map(Descriptor::Primitive)
            .unwrap_or_else(|| Descriptor::Reference(TypeName::from(keyword.as_str())))),
        serde_json::Value::Array(items) if items.len() == 1 => Ok(Descriptor::array_of(
            read_descriptor(&items[0], &path.item(0))?,
        )),
        serde_json::Value::Array(items) => Err(invalid(
            path,
            &format!("array declarations take exactly one element, found {}", items.len()),
        )),
        serde_json::Value::Object(_) => Ok(Descriptor::Literal(read_props(json, path)?)),
        other => Err(invalid(path, &format!("unexpected {other}"))),
    }
}

fn read_props(json: &serde_json::Value, path: &FieldPath) -> ModelResult<Props> {
    let map = json
        .as_object()
        .ok_or_else(|| invalid(path, "property declarations must be an object"))?;
    let mut props = Props::new();
    for (name, declaration) in map {
        let descriptor = read_descriptor(declaration, &path.child(name.as_str()))?;
        props = props.field(name.as_str(), descriptor);
    }
    Ok(props)
}

fn invalid(path: &FieldPath, reason: &str) -> ModelError {
    ModelError::InvalidDeclaration {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

impl Serialize for Descriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Descriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Descriptor::from_json(&json).map_err(D::Error::custom)
    }
}

/// Ordered property declaration of a domain type or literal shape.
///
/// Declaration order is the traversal order of the engines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    entries: Vec<(String, Descriptor)>,
}

impl Props {
    /// Creates an empty declaration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a property. Redeclaring a name replaces its descriptor in place.
    pub fn field(mut self, name: impl Into<String>, descriptor: Descriptor) -> Self {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = descriptor,
            None => self.entries.push((name, descriptor)),
        }
        self
    }

    /// Returns the descriptor of a property.
    pub fn get(&self, name: &str) -> Option<&Descriptor> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, descriptor)| descriptor)
    }

    /// Returns true if the property is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over properties in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Descriptor)> {
        self.entries
            .iter()
            .map(|(name, descriptor)| (name.as_str(), descriptor))
    }

    /// Iterates over property names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reads a property declaration from JSON. Keys are taken in the
    /// order the JSON map yields them.
    pub fn from_json(json: &serde_json::Value) -> ModelResult<Self> {
        read_props(json, &FieldPath::root())
    }

    /// Renders the JSON declaration.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(name, descriptor)| (name.clone(), descriptor.to_json()))
                .collect(),
        )
    }
}

impl Serialize for Props {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Props {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Props::from_json(&json).map_err(D::Error::custom)
    }
}
