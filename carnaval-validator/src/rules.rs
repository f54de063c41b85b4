//! Rule sets and the rule-walking validator.

use crate::{Validate, ValidationError, ValidationResult};
use carnaval_model::{Catalog, Descriptor, Kind, Props};
use carnaval_types::{FieldPath, Map, Record, TypeName, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Constraints on one property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Rules {
    /// The value must be present, non-null and not an empty string.
    pub required: bool,
    /// Rules for the properties of a nested record or shape. On arrays they
    /// apply to every item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub props: Option<RuleSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn props(mut self, props: RuleSet) -> Self {
        self.props = Some(props);
        self
    }

    pub fn min_items(mut self, min: usize) -> Self {
        self.min_items = Some(min);
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }
}

/// Rules keyed by property name.
///
/// Reads from JSON as `{ "name": { "required": true }, "thing": { "props": {..} } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: BTreeMap<String, Rules>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the rules of one property.
    pub fn rule(mut self, property: impl Into<String>, rules: Rules) -> Self {
        self.rules.insert(property.into(), rules);
        self
    }

    /// Shortcut for a property that is only required.
    pub fn require(self, property: impl Into<String>) -> Self {
        self.rule(property, Rules::new().required())
    }

    pub fn get(&self, property: &str) -> Option<&Rules> {
        self.rules.get(property)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rules)> {
        self.rules.iter().map(|(name, rules)| (name.as_str(), rules))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules of a nested property, or an empty set.
    pub(crate) fn nested(rules: Option<&Rules>) -> &RuleSet {
        static EMPTY: RuleSet = RuleSet {
            rules: BTreeMap::new(),
        };
        rules.and_then(|rules| rules.props.as_ref()).unwrap_or(&EMPTY)
    }
}

/// Checks records against their declaration and a [`RuleSet`].
///
/// Every present value must match its declared type; rules add presence and
/// item-count constraints. Nested rules on an absent object still apply, so
/// `{ "thing": { "props": { "name": { "required": true } } } }` rejects a
/// record without a `thing`.
#[derive(Debug, Clone)]
pub struct RuleValidator {
    catalog: Catalog,
    target: TypeName,
    rules: RuleSet,
}

impl RuleValidator {
    /// Fails when the type is unknown or a rule names an undeclared property.
    pub fn new(
        catalog: &Catalog,
        type_name: impl Into<TypeName>,
        rules: RuleSet,
    ) -> ValidationResult<Self> {
        let target = type_name.into();
        let props = catalog
            .props_of(target.as_str())
            .map_err(|e| ValidationError::Schema {
                message: e.to_string(),
            })?;
        check_rules(catalog, &target, props, &rules, &FieldPath::root())?;
        Ok(Self {
            catalog: catalog.clone(),
            target,
            rules,
        })
    }

    pub fn target(&self) -> &TypeName {
        &self.target
    }

    fn check_fields(
        &self,
        props: &Props,
        fields: Option<&Map>,
        rules: &RuleSet,
        path: &FieldPath,
    ) -> ValidationResult<()> {
        for (name, descriptor) in props.iter() {
            let rule = rules.get(name);
            let at = path.child(name);
            let value = fields
                .and_then(|fields| fields.get(name))
                .filter(|value| !value.is_null());

            if rule.is_some_and(|rule| rule.required) && is_blank(value) {
                return Err(ValidationError::Required {
                    path: at.to_string(),
                });
            }

            let nested = RuleSet::nested(rule);
            match value {
                Some(value) => {
                    if let Some(rule) = rule {
                        check_limits(value, rule, &at)?;
                    }
                    self.check_value(descriptor, value, nested, &at)?;
                }
                None if !nested.is_empty() => {
                    if let Some(props) = self.props_of(descriptor)? {
                        self.check_fields(props, None, nested, &at)?;
                    }
                }
                None => {}
            }
        }
        Ok(())
    }

    fn check_value(
        &self,
        descriptor: &Descriptor,
        value: &Value,
        nested: &RuleSet,
        path: &FieldPath,
    ) -> ValidationResult<()> {
        match descriptor {
            Descriptor::Primitive(kind) if matches_kind(*kind, value) => Ok(()),
            Descriptor::Primitive(kind) => Err(wrong_type(path, kind.as_str())),
            Descriptor::Reference(target) => {
                let fields = match value {
                    Value::Record(record) if record.type_name() != target => None,
                    other => other.as_map(),
                }
                .ok_or_else(|| wrong_type(path, target.as_str()))?;
                let props = self.catalog.props_of(target.as_str()).map_err(|e| {
                    ValidationError::Schema {
                        message: e.to_string(),
                    }
                })?;
                self.check_fields(props, Some(fields), nested, path)
            }
            Descriptor::Literal(props) => {
                let fields = value.as_map().ok_or_else(|| wrong_type(path, "object"))?;
                self.check_fields(props, Some(fields), nested, path)
            }
            Descriptor::Array(element) => {
                let items = value.as_array().ok_or_else(|| wrong_type(path, "array"))?;
                for (index, item) in items.iter().enumerate() {
                    if !item.is_null() {
                        self.check_value(element, item, nested, &path.item(index))?;
                    }
                }
                Ok(())
            }
        }
    }

    fn props_of<'a>(&'a self, descriptor: &'a Descriptor) -> ValidationResult<Option<&'a Props>> {
        match descriptor {
            Descriptor::Reference(target) => self
                .catalog
                .props_of(target.as_str())
                .map(Some)
                .map_err(|e| ValidationError::Schema {
                    message: e.to_string(),
                }),
            Descriptor::Literal(props) => Ok(Some(props)),
            _ => Ok(None),
        }
    }
}

impl Validate for RuleValidator {
    fn validate(&self, record: &Record) -> ValidationResult<()> {
        if !record.is_a(self.target.as_str()) {
            return Err(wrong_type(&FieldPath::root(), self.target.as_str()));
        }
        let props = self
            .catalog
            .props_of(self.target.as_str())
            .map_err(|e| ValidationError::Schema {
                message: e.to_string(),
            })?;
        self.check_fields(props, Some(record.fields()), &self.rules, &FieldPath::root())
    }
}

fn check_rules(
    catalog: &Catalog,
    owner: &TypeName,
    props: &Props,
    rules: &RuleSet,
    path: &FieldPath,
) -> ValidationResult<()> {
    for (name, rule) in rules.iter() {
        let at = path.child(name);
        let descriptor = props.get(name).ok_or_else(|| ValidationError::Schema {
            message: format!("type '{owner}' has no property '{at}'"),
        })?;
        let Some(nested) = rule.props.as_ref() else {
            continue;
        };
        match descriptor.element() {
            Descriptor::Reference(target) => {
                let inner = catalog
                    .props_of(target.as_str())
                    .map_err(|e| ValidationError::Schema {
                        message: e.to_string(),
                    })?;
                check_rules(catalog, target, inner, nested, &at)?;
            }
            Descriptor::Literal(inner) => check_rules(catalog, owner, inner, nested, &at)?,
            other => {
                return Err(ValidationError::Schema {
                    message: format!("'{at}' is {} and takes no nested rules", other.label()),
                });
            }
        }
    }
    Ok(())
}

fn check_limits(value: &Value, rule: &Rules, path: &FieldPath) -> ValidationResult<()> {
    let Some(items) = value.as_array() else {
        return Ok(());
    };
    if let Some(max) = rule.max_items.filter(|max| items.len() > *max) {
        return Err(ValidationError::TooMany {
            path: path.to_string(),
            max,
        });
    }
    if let Some(min) = rule.min_items.filter(|min| items.len() < *min) {
        return Err(ValidationError::TooFew {
            path: path.to_string(),
            min,
        });
    }
    Ok(())
}

fn matches_kind(kind: Kind, value: &Value) -> bool {
    match kind {
        Kind::String => matches!(value, Value::String(_)),
        Kind::Number => matches!(value, Value::Number(_)),
        Kind::Boolean => matches!(value, Value::Bool(_)),
        Kind::Date => matches!(value, Value::Date(_)),
        Kind::Object => true,
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(_) => false,
    }
}

fn wrong_type(path: &FieldPath, expected: &str) -> ValidationError {
    ValidationError::WrongType {
        path: path.to_string(),
        expected: expected.to_string(),
    }
}
