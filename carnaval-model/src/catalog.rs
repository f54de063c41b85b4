//! The type registry and the construction contract.

use crate::{Descriptor, ModelError, ModelResult, Props};
use carnaval_types::{FieldPath, Map, Record, TypeName, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// A named domain type and its property declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainType {
    pub name: TypeName,
    pub props: Props,
}

impl DomainType {
    pub fn new(name: impl Into<TypeName>, props: Props) -> Self {
        Self {
            name: name.into(),
            props,
        }
    }
}

/// Declares a Rust type as a domain type.
///
/// ```ignore
/// struct Thing;
/// impl Domain for Thing {
///     const NAME: &'static str = "Thing";
///     fn props() -> Props {
///         Props::new().field("name", Descriptor::string())
///     }
/// }
/// ```
pub trait Domain {
    /// Registered type name.
    const NAME: &'static str;

    /// The ordered property declaration.
    fn props() -> Props;

    fn domain_type() -> DomainType {
        DomainType::new(Self::NAME, Self::props())
    }
}

/// Immutable registry of domain types.
///
/// Cloning is cheap; clones share the same declarations. Every reference in
/// a built catalog resolves to a registered type.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    types: Arc<BTreeMap<TypeName, DomainType>>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Returns a registered type.
    pub fn get(&self, type_name: &str) -> ModelResult<&DomainType> {
        self.types
            .get(type_name)
            .ok_or_else(|| ModelError::UnknownType(type_name.to_string()))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Returns the property declaration of a registered type.
    pub fn props_of(&self, type_name: &str) -> ModelResult<&Props> {
        self.get(type_name).map(|ty| &ty.props)
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> impl Iterator<Item = &TypeName> {
        self.types.keys()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Constructs a new record of `type_name` from a field map.
    ///
    /// Only declared properties are kept. Values are converted to their
    /// descriptor: plain objects under references become records, literal
    /// shapes keep their declared keys, arrays convert element-wise and a
    /// non-array value under an array property is dropped. Null stays null.
    pub fn instantiate(&self, type_name: &str, fields: Map) -> ModelResult<Record> {
        let ty = self.get(type_name)?;
        let mut record = Record::new(ty.name.clone());
        self.fill(&ty.props, record.fields_mut(), fields)?;
        Ok(record)
    }

    /// Like [`Catalog::instantiate`], taking any object-like value.
    pub fn instantiate_value(&self, type_name: &str, value: Value) -> ModelResult<Record> {
        match value {
            Value::Object(map) => self.instantiate(type_name, map),
            Value::Record(record) => self.instantiate(type_name, record.into_fields()),
            other => Err(ModelError::NotAnObject {
                type_name: type_name.to_string(),
                found: other.type_label(),
            }),
        }
    }

    /// Merges declared fields into an existing record, converting them the
    /// same way [`Catalog::instantiate`] does. Other fields are untouched.
    pub fn assign(&self, record: &mut Record, fields: Map) -> ModelResult<()> {
        let props = self.props_of(record.type_name().as_str())?.clone();
        self.fill(&props, record.fields_mut(), fields)
    }

    fn fill(&self, props: &Props, target: &mut Map, mut fields: Map) -> ModelResult<()> {
        for (name, descriptor) in props.iter() {
            let Some(value) = fields.remove(name) else {
                continue;
            };
            if let Some(converted) = self.convert(descriptor, value)? {
                target.insert(name.to_string(), converted);
            }
        }
        if !fields.is_empty() {
            debug!(dropped = fields.len(), "ignoring undeclared fields");
        }
        Ok(())
    }

    fn convert(&self, descriptor: &Descriptor, value: Value) -> ModelResult<Option<Value>> {
        if value.is_null() {
            return Ok(Some(Value::Null));
        }
        let converted = match descriptor {
            Descriptor::Primitive(_) => value,
            Descriptor::Reference(target) => match value {
                Value::Record(record) if record.type_name() == target => Value::Record(record),
                Value::Object(map) => Value::Record(self.instantiate(target.as_str(), map)?),
                Value::Record(record) => {
                    Value::Record(self.instantiate(target.as_str(), record.into_fields())?)
                }
                other => other,
            },
            Descriptor::Literal(props) => match value {
                Value::Object(map) => {
                    let mut shaped = Map::new();
                    self.fill(props, &mut shaped, map)?;
                    Value::Object(shaped)
                }
                Value::Record(record) => {
                    let mut shaped = Map::new();
                    self.fill(props, &mut shaped, record.into_fields())?;
                    Value::Object(shaped)
                }
                other => other,
            },
            Descriptor::Array(element) => match value {
                Value::Array(items) => {
                    let mut converted = Vec::with_capacity(items.len());
                    for item in items {
                        converted.push(self.convert(element, item)?.unwrap_or(Value::Null));
                    }
                    Value::Array(converted)
                }
                _ => return Ok(None),
            },
        };
        Ok(Some(converted))
    }
}

/// Collects type declarations and validates them into a [`Catalog`].
#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    types: Vec<DomainType>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type declaration.
    pub fn register(mut self, ty: DomainType) -> Self {
        self.types.push(ty);
        self
    }

    /// Adds a type from its name and properties.
    pub fn declare(self, name: impl Into<TypeName>, props: Props) -> Self {
        self.register(DomainType::new(name, props))
    }

    /// Adds a type declared through the [`Domain`] trait.
    pub fn register_domain<T: Domain>(self) -> Self {
        self.register(T::domain_type())
    }

    /// Adds every type of a JSON catalog document:
    /// `{ "Thing": { "name": "string" }, "Box": { "thing": "Thing" } }`.
    pub fn from_json(mut self, json: &serde_json::Value) -> ModelResult<Self> {
        let map = json.as_object().ok_or_else(|| ModelError::InvalidDeclaration {
            path: FieldPath::root().to_string(),
            reason: "catalog must be an object of type declarations".to_string(),
        })?;
        for (name, declaration) in map {
            let props = Props::from_json(declaration).map_err(|e| match e {
                ModelError::InvalidDeclaration { path, reason } => ModelError::InvalidDeclaration {
                    path: prefix_path(name, &path),
                    reason,
                },
                other => other,
            })?;
            self = self.declare(name.as_str(), props);
        }
        Ok(self)
    }

    /// Validates and freezes the declarations.
    ///
    /// Fails on duplicate names and on references to unregistered types.
    pub fn build(self) -> ModelResult<Catalog> {
        let mut types = BTreeMap::new();
        for ty in self.types {
            if types.contains_key(&ty.name) {
                return Err(ModelError::DuplicateType(ty.name.to_string()));
            }
            types.insert(ty.name.clone(), ty);
        }

        for ty in types.values() {
            for (name, descriptor) in ty.props.iter() {
                check_references(&types, &ty.name, &FieldPath::root().child(name), descriptor)?;
            }
        }

        debug!(types = types.len(), "catalog built");
        Ok(Catalog {
            types: Arc::new(types),
        })
    }
}

fn check_references(
    types: &BTreeMap<TypeName, DomainType>,
    owner: &TypeName,
    path: &FieldPath,
    descriptor: &Descriptor,
) -> ModelResult<()> {
    match descriptor {
        Descriptor::Primitive(_) => Ok(()),
        Descriptor::Reference(target) if types.contains_key(target) => Ok(()),
        Descriptor::Reference(target) => Err(ModelError::DanglingReference {
            owner: owner.to_string(),
            property: path.to_string(),
            target: target.to_string(),
        }),
        Descriptor::Literal(props) => {
            for (name, inner) in props.iter() {
                check_references(types, owner, &path.child(name), inner)?;
            }
            Ok(())
        }
        Descriptor::Array(inner) => check_references(types, owner, &path.item(0), inner),
    }
}

fn prefix_path(type_name: &str, path: &str) -> String {
    if path == FieldPath::root().to_string() {
        type_name.to_string()
    } else if path.starts_with('[') {
        format!("{type_name}{path}")
    } else {
        format!("{type_name}.{path}")
    }
}
