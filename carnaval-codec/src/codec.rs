//! The traversal engine.
//!
//! Walks a value against a [`Schema`]: arrays element-wise, objects
//! property by property in declaration order. Per property the override is
//! resolved as named override, then type-wide override of the nearest
//! explicit schema (looked up on the element type), then identity plus
//! normalization. Property futures of one level and element futures of one
//! array are joined with `try_join_all`; hook chains run sequentially.

use crate::normalize::normalize;
use crate::schema::Part;
use crate::transform::Direction;
use crate::{
    Access, CodecError, CodecResult, CustomCodec, Mapping, Middleware, Providers, Schema,
    UnknownKeys,
};
use carnaval_model::{Descriptor, Kind, Props};
use carnaval_types::{FieldPath, Map, Value};
use futures::future::{BoxFuture, FutureExt, try_join_all};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Encodes domain values to wire values and decodes them back.
#[derive(Debug, Clone)]
pub struct Codec {
    schema: Schema,
    providers: Providers,
}

impl Codec {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            providers: Providers::default(),
        }
    }

    /// Returns a codec using `providers` for every call.
    pub fn with_providers(&self, providers: Providers) -> Self {
        Self {
            schema: self.schema.clone(),
            providers,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    /// Encodes a record (or an array of records) to its wire form.
    pub async fn encode(&self, value: impl Into<Value>) -> CodecResult<Value> {
        self.encode_with(value, &self.providers).await
    }

    /// Decodes a wire value (or an array of them) to records.
    pub async fn decode(&self, value: impl Into<Value>) -> CodecResult<Value> {
        self.decode_with(value, &self.providers).await
    }

    /// Encodes with providers for this call only.
    pub async fn encode_with(
        &self,
        value: impl Into<Value>,
        providers: &Providers,
    ) -> CodecResult<Value> {
        debug!(type_name = %self.schema.target(), "encode");
        Engine::new(providers, Direction::Encode)
            .run(&self.schema, value.into(), FieldPath::root())
            .await
    }

    /// Decodes with providers for this call only.
    pub async fn decode_with(
        &self,
        value: impl Into<Value>,
        providers: &Providers,
    ) -> CodecResult<Value> {
        debug!(type_name = %self.schema.target(), "decode");
        Engine::new(providers, Direction::Decode)
            .run(&self.schema, value.into(), FieldPath::root())
            .await
    }

    /// Encodes and renders the result as plain JSON.
    pub async fn encode_json(&self, value: impl Into<Value>) -> CodecResult<serde_json::Value> {
        Ok(self.encode(value).await?.to_json())
    }

    /// Decodes a plain JSON document.
    pub async fn decode_json(&self, json: serde_json::Value) -> CodecResult<Value> {
        self.decode(Value::from(json)).await
    }
}

type Overrides = BTreeMap<String, Mapping>;

/// One object level being walked.
#[derive(Clone, Copy)]
struct Level<'a> {
    /// Nearest explicit schema: type-wide overrides and configuration.
    schema: &'a Schema,
    props: &'a Props,
    overrides: Option<&'a Overrides>,
    selection: Option<&'a [String]>,
}

impl<'a> Level<'a> {
    fn named(&self, property: &str) -> Option<&'a Mapping> {
        self.overrides.and_then(|overrides| overrides.get(property))
    }

    fn wire_name(&self, property: &'a str) -> &'a str {
        self.named(property)
            .and_then(Mapping::alias)
            .unwrap_or(property)
    }
}

#[derive(Clone, Copy)]
struct Engine<'p> {
    providers: &'p Providers,
    direction: Direction,
}

impl<'p> Engine<'p> {
    fn new(providers: &'p Providers, direction: Direction) -> Self {
        Self {
            providers,
            direction,
        }
    }

    /// Entry point for a schema: arrays element-wise, each element through
    /// the full hook pipeline.
    fn run<'s>(
        self,
        schema: &'s Schema,
        input: Value,
        path: FieldPath,
    ) -> BoxFuture<'s, CodecResult<Value>>
    where
        'p: 's,
    {
        async move {
            match input {
                Value::Array(items) => {
                    let elements = items
                        .into_iter()
                        .enumerate()
                        .map(|(index, item)| self.run(schema, item, path.item(index)));
                    Ok(Value::Array(try_join_all(elements).await?))
                }
                other => self.pipeline(schema, other, path).await,
            }
        }
        .boxed()
    }

    fn pipeline<'s>(
        self,
        schema: &'s Schema,
        input: Value,
        path: FieldPath,
    ) -> BoxFuture<'s, CodecResult<Value>>
    where
        'p: 's,
    {
        async move {
            if input.is_null() {
                return Ok(Value::Null);
            }
            let hooks = schema.hooks();
            let original = input.clone();
            let current =
                apply_hooks(hooks.before(self.direction), input, &original, self.providers).await?;
            let result = self.typed_level(schema, &current, &path).await?;
            apply_hooks(hooks.after(self.direction), result, &original, self.providers).await
        }
        .boxed()
    }

    /// Maps one element of an explicit schema's target type.
    fn typed_level<'s>(
        self,
        schema: &'s Schema,
        source: &'s Value,
        path: &'s FieldPath,
    ) -> BoxFuture<'s, CodecResult<Value>>
    where
        'p: 's,
    {
        async move {
            if let Some(custom) = schema.custom() {
                return self.custom_level(schema, custom, source, path).await;
            }
            let catalog = schema.catalog();
            let target = schema.target().as_str();
            let level = Level {
                schema,
                props: catalog.props_of(target)?,
                overrides: Some(schema.properties()),
                selection: Some(schema.selected()),
            };
            let fields = self.fields(level, source, path.clone()).await?;
            match self.direction {
                Direction::Encode => Ok(Value::Object(fields)),
                Direction::Decode => Ok(Value::Record(catalog.instantiate(target, fields)?)),
            }
        }
        .boxed()
    }

    fn custom_level<'s>(
        self,
        schema: &'s Schema,
        custom: &'s CustomCodec,
        source: &'s Value,
        path: &'s FieldPath,
    ) -> BoxFuture<'s, CodecResult<Value>>
    where
        'p: 's,
    {
        async move {
            if source.as_map().is_none() {
                return Err(mismatch(path, "object", source));
            }
            let draft = custom.draft(self.direction, source, self.providers).await?;
            let mut fields = Map::new();
            for (name, part) in draft.into_fields() {
                let value = match part {
                    Part::Done(value) => value,
                    Part::Deferred(child) => {
                        let Some(input) = source.get(&name) else {
                            continue;
                        };
                        self.run(&child, input.clone(), path.child(name.as_str()))
                            .await?
                    }
                };
                fields.insert(name, value);
            }
            match self.direction {
                Direction::Encode => Ok(Value::Object(fields)),
                Direction::Decode => Ok(Value::Record(
                    schema
                        .catalog()
                        .instantiate(schema.target().as_str(), fields)?,
                )),
            }
        }
        .boxed()
    }

    /// Maps the selected properties of one object level.
    fn fields<'s>(
        self,
        level: Level<'s>,
        source: &'s Value,
        path: FieldPath,
    ) -> BoxFuture<'s, CodecResult<Map>>
    where
        'p: 's,
    {
        async move {
            let map = source
                .as_map()
                .ok_or_else(|| mismatch(&path, "object", source))?;

            if self.direction == Direction::Decode {
                self.check_unknown_keys(level, map, &path)?;
            }

            let names: Vec<&'s str> = match level.selection {
                Some(selection) => selection.iter().map(String::as_str).collect(),
                None => level.props.names().collect(),
            };

            let properties = names.into_iter().filter_map(|name| {
                level
                    .props
                    .get(name)
                    .map(|descriptor| self.property(level, name, descriptor, source, map, &path))
            });
            let mapped = try_join_all(properties).await?;

            Ok(mapped.into_iter().flatten().collect())
        }
        .boxed()
    }

    fn check_unknown_keys(self, level: Level<'_>, map: &Map, path: &FieldPath) -> CodecResult<()> {
        for key in map.keys() {
            let known = level
                .props
                .names()
                .any(|name| level.wire_name(name) == key.as_str());
            if known {
                continue;
            }
            match level.schema.config().unknown_keys {
                UnknownKeys::Reject => {
                    return Err(CodecError::UnknownKey {
                        path: path.to_string(),
                        key: key.clone(),
                    });
                }
                UnknownKeys::Drop => debug!(%path, key = %key, "dropping unknown key"),
            }
        }
        Ok(())
    }

    /// Maps one property, returning the output key and value, or `None`
    /// when the property is hidden or absent.
    fn property<'s>(
        self,
        level: Level<'s>,
        name: &'s str,
        descriptor: &'s Descriptor,
        source: &'s Value,
        map: &'s Map,
        path: &FieldPath,
    ) -> BoxFuture<'s, CodecResult<Option<(String, Value)>>>
    where
        'p: 's,
    {
        let path = path.clone();
        async move {
            let named = level.named(name);
            let mapping = named.or_else(|| level.schema.mapping_for(descriptor.element()));

            let visible = match named {
                Some(mapping) => mapping.allows(self.direction),
                None => {
                    let permissions = level.schema.config().permissions;
                    let allowed = match self.direction {
                        Direction::Encode => permissions.read,
                        Direction::Decode => permissions.write,
                    };
                    allowed && mapping.is_none_or(|m| m.allows(self.direction))
                }
            };
            if !visible {
                trace!(property = name, "hidden");
                return Ok(None);
            }

            let wire = level.wire_name(name);
            let (read_key, write_key) = match self.direction {
                Direction::Encode => (name, wire),
                Direction::Decode => (wire, name),
            };

            let value = match map.get(read_key) {
                Some(Value::Null) | None if descriptor.is_array() => {
                    return Ok(Some((write_key.to_string(), Value::Array(Vec::new()))));
                }
                None => return Ok(None),
                Some(value) => value,
            };

            let mapped = self
                .value(level.schema, descriptor, mapping, value, source, path.child(read_key))
                .await?;
            Ok(Some((write_key.to_string(), mapped)))
        }
        .boxed()
    }

    fn value<'s>(
        self,
        schema: &'s Schema,
        descriptor: &'s Descriptor,
        mapping: Option<&'s Mapping>,
        value: &'s Value,
        source: &'s Value,
        path: FieldPath,
    ) -> BoxFuture<'s, CodecResult<Value>>
    where
        'p: 's,
    {
        async move {
            if let Descriptor::Array(element) = descriptor {
                let items = match value {
                    Value::Array(items) => items,
                    Value::Null => return Ok(Value::Null),
                    other => return Err(mismatch(&path, "array", other)),
                };
                let per_item = match mapping {
                    Some(Mapping::Each(inner)) => Some(inner.as_ref()),
                    other => other,
                };
                let items = items.iter().enumerate().map(|(index, item)| {
                    self.value(schema, element, per_item, item, source, path.item(index))
                });
                return Ok(Value::Array(try_join_all(items).await?));
            }

            match mapping {
                Some(Mapping::Transform(transform)) => match transform.access(self.direction) {
                    Access::Fn(f) => f.call(value.clone(), source, self.providers).await,
                    Access::Default | Access::Hidden => {
                        self.default_value(schema, descriptor, None, value, path).await
                    }
                },
                Some(Mapping::Nested(child)) => self.pipeline(child, value.clone(), path).await,
                Some(Mapping::Shape(shape)) => {
                    self.default_value(schema, descriptor, Some(shape), value, path)
                        .await
                }
                Some(Mapping::Each(_)) | None => {
                    self.default_value(schema, descriptor, None, value, path).await
                }
            }
        }
        .boxed()
    }

    /// Identity plus normalization for primitives; free recursion for
    /// references and literal shapes.
    fn default_value<'s>(
        self,
        schema: &'s Schema,
        descriptor: &'s Descriptor,
        shape: Option<&'s Overrides>,
        value: &'s Value,
        path: FieldPath,
    ) -> BoxFuture<'s, CodecResult<Value>>
    where
        'p: 's,
    {
        async move {
            match descriptor {
                Descriptor::Primitive(Kind::Object) => Ok(value.clone()),
                Descriptor::Primitive(kind) => Ok(match self.direction {
                    Direction::Decode if schema.config().normalize => normalize(*kind, value),
                    _ => value.clone(),
                }),
                Descriptor::Reference(target) => {
                    if value.is_null() {
                        return Ok(Value::Null);
                    }
                    let catalog = schema.catalog();
                    let level = Level {
                        schema,
                        props: catalog.props_of(target.as_str())?,
                        overrides: shape,
                        selection: None,
                    };
                    let fields = self.fields(level, value, path).await?;
                    match self.direction {
                        Direction::Encode => Ok(Value::Object(fields)),
                        Direction::Decode => Ok(Value::Record(
                            catalog.instantiate(target.as_str(), fields)?,
                        )),
                    }
                }
                Descriptor::Literal(props) => {
                    if value.is_null() {
                        return Ok(Value::Null);
                    }
                    let level = Level {
                        schema,
                        props,
                        overrides: shape,
                        selection: None,
                    };
                    Ok(Value::Object(self.fields(level, value, path).await?))
                }
                Descriptor::Array(_) => {
                    self.value(schema, descriptor, None, value, value, path).await
                }
            }
        }
        .boxed()
    }
}

async fn apply_hooks(
    hooks: &[Middleware],
    mut current: Value,
    original: &Value,
    providers: &Providers,
) -> CodecResult<Value> {
    for hook in hooks {
        if let Some(replacement) = hook.call(current.clone(), original, providers).await? {
            current = replacement;
        }
    }
    Ok(current)
}

fn mismatch(path: &FieldPath, expected: &str, found: &Value) -> CodecError {
    CodecError::TypeMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        found: found.type_label().to_string(),
    }
}
