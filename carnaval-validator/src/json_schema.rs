//! Validation through a derived JSON Schema document.

use crate::{RuleSet, Validate, ValidationError, ValidationResult};
use carnaval_model::{Catalog, Descriptor, Kind, Props};
use carnaval_types::{FieldPath, Record, TypeName, Value};
use jsonschema::error::{TypeKind, ValidationErrorKind};
use serde_json::json;
use std::fmt;
use tracing::debug;

/// Validates the JSON form of records against a schema derived from the
/// catalog declaration and a [`RuleSet`].
///
/// Declared kinds become `type` keywords (dates are `date-time` strings),
/// references and literal shapes become nested objects, `required` rules
/// become `required` lists and item limits become `minItems` / `maxItems`.
/// Null fields are treated as absent. A type nested inside itself is only
/// checked to be an object.
pub struct JsonSchemaValidator {
    target: TypeName,
    document: serde_json::Value,
    validator: jsonschema::Validator,
}

impl JsonSchemaValidator {
    pub fn new(
        catalog: &Catalog,
        type_name: impl Into<TypeName>,
        rules: &RuleSet,
    ) -> ValidationResult<Self> {
        let target = type_name.into();
        let props = catalog
            .props_of(target.as_str())
            .map_err(|e| ValidationError::Schema {
                message: e.to_string(),
            })?;
        let mut path = vec![target.clone()];
        let document = object_schema(catalog, props, rules, &mut path);
        let validator =
            jsonschema::validator_for(&document).map_err(|e| ValidationError::Schema {
                message: e.to_string(),
            })?;
        debug!(type_name = %target, "json schema compiled");
        Ok(Self {
            target,
            document,
            validator,
        })
    }

    pub fn target(&self) -> &TypeName {
        &self.target
    }

    /// The derived JSON Schema document.
    pub fn document(&self) -> &serde_json::Value {
        &self.document
    }
}

impl fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("target", &self.target)
            .field("document", &self.document)
            .finish()
    }
}

impl Validate for JsonSchemaValidator {
    fn validate(&self, record: &Record) -> ValidationResult<()> {
        if !record.is_a(self.target.as_str()) {
            return Err(ValidationError::WrongType {
                path: FieldPath::root().to_string(),
                expected: self.target.to_string(),
            });
        }
        let instance = without_nulls(Value::Record(record.clone()).to_json());
        let first = self.validator.iter_errors(&instance).next();
        match first {
            None => Ok(()),
            Some(error) => Err(violation(&error, &instance)),
        }
    }
}

fn object_schema(
    catalog: &Catalog,
    props: &Props,
    rules: &RuleSet,
    path: &mut Vec<TypeName>,
) -> serde_json::Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();
    for (name, descriptor) in props.iter() {
        let rule = rules.get(name);
        if rule.is_some_and(|rule| rule.required) {
            required.push(json!(name));
        }
        let mut schema = property_schema(catalog, descriptor, RuleSet::nested(rule), path);
        if let (Some(rule), Some(object)) = (rule, schema.as_object_mut()) {
            if let Some(min) = rule.min_items {
                object.insert("minItems".to_string(), json!(min));
            }
            if let Some(max) = rule.max_items {
                object.insert("maxItems".to_string(), json!(max));
            }
        }
        properties.insert(name.to_string(), schema);
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn property_schema(
    catalog: &Catalog,
    descriptor: &Descriptor,
    nested: &RuleSet,
    path: &mut Vec<TypeName>,
) -> serde_json::Value {
    match descriptor {
        Descriptor::Primitive(Kind::String) => json!({ "type": "string" }),
        Descriptor::Primitive(Kind::Number) => json!({ "type": "number" }),
        Descriptor::Primitive(Kind::Boolean) => json!({ "type": "boolean" }),
        Descriptor::Primitive(Kind::Date) => json!({ "type": "string", "format": "date-time" }),
        Descriptor::Primitive(Kind::Object) => json!({}),
        Descriptor::Reference(target) => match catalog.props_of(target.as_str()) {
            Ok(props) if !path.contains(target) => {
                path.push(target.clone());
                let schema = object_schema(catalog, props, nested, path);
                path.pop();
                schema
            }
            _ => json!({ "type": "object" }),
        },
        Descriptor::Literal(props) => object_schema(catalog, props, nested, path),
        Descriptor::Array(element) => json!({
            "type": "array",
            "items": property_schema(catalog, element, nested, path),
        }),
    }
}

fn violation(
    error: &jsonschema::ValidationError<'_>,
    instance: &serde_json::Value,
) -> ValidationError {
    let path = pointer_to_path(&error.instance_path.to_string(), instance);
    match &error.kind {
        ValidationErrorKind::Required { property } => ValidationError::Required {
            path: path.child(property.as_str().unwrap_or_default()).to_string(),
        },
        ValidationErrorKind::Type {
            kind: TypeKind::Single(expected),
        } => ValidationError::WrongType {
            path: path.to_string(),
            expected: expected.to_string(),
        },
        ValidationErrorKind::MaxItems { limit } => ValidationError::TooMany {
            path: path.to_string(),
            max: usize::try_from(*limit).unwrap_or(usize::MAX),
        },
        ValidationErrorKind::MinItems { limit } => ValidationError::TooFew {
            path: path.to_string(),
            min: usize::try_from(*limit).unwrap_or(usize::MAX),
        },
        _ => ValidationError::Schema {
            message: format!("{path}: {error}"),
        },
    }
}

/// Reads a JSON pointer (`/things/1/name`) as a field path (`things[1].name`).
///
/// A numeric token is an index only where `instance` holds an array there.
fn pointer_to_path(pointer: &str, instance: &serde_json::Value) -> FieldPath {
    let mut path = FieldPath::root();
    let mut node = Some(instance);
    for token in pointer.split('/').skip(1) {
        let token = token.replace("~1", "/").replace("~0", "~");
        let index = match node {
            Some(serde_json::Value::Array(_)) => token.parse::<usize>().ok(),
            _ => None,
        };
        match index {
            Some(index) => {
                node = node.and_then(|current| current.get(index));
                path = path.item(index);
            }
            None => {
                node = node.and_then(|current| current.get(token.as_str()));
                path = path.child(token);
            }
        }
    }
    path
}

fn without_nulls(json: serde_json::Value) -> serde_json::Value {
    match json {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| (key, without_nulls(value)))
                .collect(),
        ),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(without_nulls).collect())
        }
        other => other,
    }
}
