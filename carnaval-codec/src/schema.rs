//! Schemas: which properties of a type participate in encode/decode, and how.
//!
//! A [`SchemaBuilder`] starts with every declared property selected and no
//! overrides. [`SchemaBuilder::build`] checks every name and mapping against
//! the catalog and freezes the result into a cheaply clonable [`Schema`].

use crate::transform::Direction;
use crate::{
    CodecConfig, CodecResult, Mapping, Middleware, Permissions, Providers, SchemaError,
    SchemaResult, Selector, Transform, TypeKey,
};
use carnaval_model::{Catalog, Descriptor, Kind};
use carnaval_types::{TypeName, Value};
use futures::future::{self, BoxFuture, FutureExt};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// One field of a [`Draft`].
#[derive(Debug, Clone)]
pub enum Part {
    /// A finished value.
    Done(Value),
    /// Resolve the source field of the same name with this schema.
    Deferred(Schema),
}

/// Output of a custom whole-object codec: an ordered set of fields.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    fields: Vec<(String, Part)>,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a finished field.
    pub fn done(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), Part::Done(value.into())));
        self
    }

    /// Adds a field resolved recursively from the source with `schema`.
    pub fn defer(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.fields.push((name.into(), Part::Deferred(schema)));
        self
    }

    pub fn fields(&self) -> &[(String, Part)] {
        &self.fields
    }

    pub(crate) fn into_fields(self) -> Vec<(String, Part)> {
        self.fields
    }
}

/// Future returned by a custom codec function.
pub type DraftFuture = BoxFuture<'static, CodecResult<Draft>>;

type CustomFn = Arc<dyn Fn(&Value, &Providers) -> DraftFuture + Send + Sync>;

/// Whole-object encode/decode functions replacing per-property traversal.
#[derive(Clone)]
pub struct CustomCodec {
    encode: CustomFn,
    decode: CustomFn,
}

impl CustomCodec {
    /// Wraps synchronous functions.
    pub fn new<E, D>(encode: E, decode: D) -> Self
    where
        E: Fn(&Value, &Providers) -> CodecResult<Draft> + Send + Sync + 'static,
        D: Fn(&Value, &Providers) -> CodecResult<Draft> + Send + Sync + 'static,
    {
        Self {
            encode: Arc::new(move |source: &Value, providers: &Providers| {
                future::ready(encode(source, providers)).boxed()
            }),
            decode: Arc::new(move |source: &Value, providers: &Providers| {
                future::ready(decode(source, providers)).boxed()
            }),
        }
    }

    /// Wraps async functions. The source and providers are passed by value
    /// so the returned future can outlive the call.
    pub fn from_async<E, EFut, D, DFut>(encode: E, decode: D) -> Self
    where
        E: Fn(Value, Providers) -> EFut + Send + Sync + 'static,
        EFut: Future<Output = CodecResult<Draft>> + Send + 'static,
        D: Fn(Value, Providers) -> DFut + Send + Sync + 'static,
        DFut: Future<Output = CodecResult<Draft>> + Send + 'static,
    {
        Self {
            encode: Arc::new(move |source: &Value, providers: &Providers| {
                encode(source.clone(), providers.clone()).boxed()
            }),
            decode: Arc::new(move |source: &Value, providers: &Providers| {
                decode(source.clone(), providers.clone()).boxed()
            }),
        }
    }

    pub(crate) fn draft(
        &self,
        direction: Direction,
        source: &Value,
        providers: &Providers,
    ) -> DraftFuture {
        match direction {
            Direction::Encode => (self.encode)(source, providers),
            Direction::Decode => (self.decode)(source, providers),
        }
    }
}

impl fmt::Debug for CustomCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomCodec")
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Hooks {
    before_encode: Vec<Middleware>,
    after_encode: Vec<Middleware>,
    before_decode: Vec<Middleware>,
    after_decode: Vec<Middleware>,
}

impl Hooks {
    pub(crate) fn before(&self, direction: Direction) -> &[Middleware] {
        match direction {
            Direction::Encode => &self.before_encode,
            Direction::Decode => &self.before_decode,
        }
    }

    pub(crate) fn after(&self, direction: Direction) -> &[Middleware] {
        match direction {
            Direction::Encode => &self.after_encode,
            Direction::Decode => &self.after_decode,
        }
    }
}

#[derive(Debug)]
struct SchemaInner {
    catalog: Catalog,
    target: TypeName,
    selected: Vec<String>,
    properties: BTreeMap<String, Mapping>,
    types: HashMap<TypeKey, Mapping>,
    custom: Option<CustomCodec>,
    config: CodecConfig,
    hooks: Hooks,
}

/// A validated, immutable schema for one domain type.
#[derive(Debug, Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

impl Schema {
    /// Starts a schema for `type_name` with every declared property selected.
    pub fn builder(catalog: &Catalog, type_name: impl Into<TypeName>) -> SchemaBuilder {
        SchemaBuilder {
            catalog: catalog.clone(),
            target: type_name.into(),
            selection: None,
            properties: Vec::new(),
            types: HashMap::new(),
            custom: None,
            config: CodecConfig::default(),
            hooks: Hooks::default(),
        }
    }

    /// Shorthand for a schema with no overrides.
    pub fn for_type(catalog: &Catalog, type_name: impl Into<TypeName>) -> SchemaResult<Schema> {
        Self::builder(catalog, type_name).build()
    }

    /// Returns a builder holding this schema's configuration, to derive a variant.
    pub fn to_builder(&self) -> SchemaBuilder {
        let inner = &self.inner;
        SchemaBuilder {
            catalog: inner.catalog.clone(),
            target: inner.target.clone(),
            selection: Some(
                inner
                    .selected
                    .iter()
                    .map(|name| Selector::new(name.clone()))
                    .collect(),
            ),
            properties: inner
                .properties
                .iter()
                .map(|(name, mapping)| (name.clone(), mapping.clone()))
                .collect(),
            types: inner.types.clone(),
            custom: inner.custom.clone(),
            config: inner.config,
            hooks: inner.hooks.clone(),
        }
    }

    pub fn target(&self) -> &TypeName {
        &self.inner.target
    }

    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    pub fn config(&self) -> &CodecConfig {
        &self.inner.config
    }

    /// Selected property names, in declaration order.
    pub fn selected(&self) -> &[String] {
        &self.inner.selected
    }

    /// Named override of a property.
    pub fn property(&self, name: &str) -> Option<&Mapping> {
        self.inner.properties.get(name)
    }

    /// Type-wide default override.
    pub fn type_mapping(&self, key: &TypeKey) -> Option<&Mapping> {
        self.inner.types.get(key)
    }

    pub(crate) fn properties(&self) -> &BTreeMap<String, Mapping> {
        &self.inner.properties
    }

    pub(crate) fn custom(&self) -> Option<&CustomCodec> {
        self.inner.custom.as_ref()
    }

    pub(crate) fn hooks(&self) -> &Hooks {
        &self.inner.hooks
    }

    /// Type-wide override applying to a property's element descriptor.
    pub(crate) fn mapping_for(&self, element: &Descriptor) -> Option<&Mapping> {
        match element {
            Descriptor::Primitive(kind) => self.type_mapping(&TypeKey::Kind(*kind)),
            Descriptor::Reference(name) => self.type_mapping(&TypeKey::Type(name.clone())),
            Descriptor::Literal(_) | Descriptor::Array(_) => None,
        }
    }
}

/// Consuming builder for [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    catalog: Catalog,
    target: TypeName,
    selection: Option<Vec<Selector>>,
    properties: Vec<(String, Mapping)>,
    types: HashMap<TypeKey, Mapping>,
    custom: Option<CustomCodec>,
    config: CodecConfig,
    hooks: Hooks,
}

impl SchemaBuilder {
    /// Narrows the active properties to the given selectors.
    pub fn select<S: Into<Selector>>(mut self, selectors: impl IntoIterator<Item = S>) -> Self {
        self.selection = Some(selectors.into_iter().map(Into::into).collect());
        self
    }

    /// Uses `schema` for every property referencing its target type.
    pub fn map_nested_type(mut self, schema: Schema) -> Self {
        self.types
            .insert(TypeKey::Type(schema.target().clone()), Mapping::Nested(schema));
        self
    }

    /// Uses `transform` for every property of the given primitive kind.
    pub fn map_kind(mut self, kind: Kind, transform: Transform) -> Self {
        self.types
            .insert(TypeKey::Kind(kind), Mapping::Transform(transform));
        self
    }

    /// Registers a type-wide default override.
    pub fn map_type(mut self, key: impl Into<TypeKey>, mapping: impl Into<Mapping>) -> Self {
        self.types.insert(key.into(), mapping.into());
        self
    }

    /// Overrides one property.
    pub fn map_property(mut self, name: impl Into<String>, mapping: impl Into<Mapping>) -> Self {
        self.properties.push((name.into(), mapping.into()));
        self
    }

    /// Overrides several properties.
    pub fn map_properties<K, M>(mut self, entries: impl IntoIterator<Item = (K, M)>) -> Self
    where
        K: Into<String>,
        M: Into<Mapping>,
    {
        self.properties.extend(
            entries
                .into_iter()
                .map(|(name, mapping)| (name.into(), mapping.into())),
        );
        self
    }

    /// Replaces per-property traversal with whole-object functions.
    pub fn with_custom_codec<E, D>(mut self, encode: E, decode: D) -> Self
    where
        E: Fn(&Value, &Providers) -> CodecResult<Draft> + Send + Sync + 'static,
        D: Fn(&Value, &Providers) -> CodecResult<Draft> + Send + Sync + 'static,
    {
        self.custom = Some(CustomCodec::new(encode, decode));
        self
    }

    /// Like [`SchemaBuilder::with_custom_codec`], with async functions.
    pub fn with_async_custom_codec<E, EFut, D, DFut>(mut self, encode: E, decode: D) -> Self
    where
        E: Fn(Value, Providers) -> EFut + Send + Sync + 'static,
        EFut: Future<Output = CodecResult<Draft>> + Send + 'static,
        D: Fn(Value, Providers) -> DFut + Send + Sync + 'static,
        DFut: Future<Output = CodecResult<Draft>> + Send + 'static,
    {
        self.custom = Some(CustomCodec::from_async(encode, decode));
        self
    }

    pub fn configure(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    /// Enables or disables decode normalization.
    pub fn normalize(mut self, normalize: bool) -> Self {
        self.config.normalize = normalize;
        self
    }

    /// Read/write defaults for properties without a named override.
    pub fn permissions(mut self, permissions: Permissions) -> Self {
        self.config.permissions = permissions;
        self
    }

    pub fn before_encode(mut self, middleware: Middleware) -> Self {
        self.hooks.before_encode.push(middleware);
        self
    }

    pub fn after_encode(mut self, middleware: Middleware) -> Self {
        self.hooks.after_encode.push(middleware);
        self
    }

    pub fn before_decode(mut self, middleware: Middleware) -> Self {
        self.hooks.before_decode.push(middleware);
        self
    }

    pub fn after_decode(mut self, middleware: Middleware) -> Self {
        self.hooks.after_decode.push(middleware);
        self
    }

    /// Validates names and mappings against the catalog and freezes the schema.
    pub fn build(self) -> SchemaResult<Schema> {
        let props = self
            .catalog
            .props_of(self.target.as_str())
            .map_err(|_| SchemaError::UnknownType(self.target.to_string()))?;

        let mut overrides = BTreeMap::new();
        let selected = match self.selection {
            None => props.names().map(String::from).collect(),
            Some(selectors) => {
                let mut seen = BTreeSet::new();
                for selector in selectors {
                    if !props.contains(&selector.name) {
                        return Err(unknown_property(&self.target, &selector.name));
                    }
                    if !seen.insert(selector.name.clone()) {
                        return Err(SchemaError::DuplicateSelection(selector.name));
                    }
                    if let Some(mapping) = selector.mapping {
                        overrides.insert(selector.name, mapping);
                    }
                }
                props
                    .names()
                    .filter(|name| seen.contains(*name))
                    .map(String::from)
                    .collect::<Vec<_>>()
            }
        };

        for (name, mapping) in self.properties {
            overrides.insert(name, mapping);
        }

        for (name, mapping) in &overrides {
            let descriptor = props
                .get(name)
                .ok_or_else(|| unknown_property(&self.target, name))?;
            check_mapping(&self.catalog, &self.target, name, descriptor, mapping)?;
        }

        for (key, mapping) in &self.types {
            check_type_mapping(&self.catalog, key, mapping)?;
        }

        debug!(
            type_name = %self.target,
            selected = selected.len(),
            overrides = overrides.len(),
            "schema built"
        );

        Ok(Schema {
            inner: Arc::new(SchemaInner {
                catalog: self.catalog,
                target: self.target,
                selected,
                properties: overrides,
                types: self.types,
                custom: self.custom,
                config: self.config,
                hooks: self.hooks,
            }),
        })
    }
}

fn unknown_property(type_name: &TypeName, property: &str) -> SchemaError {
    SchemaError::UnknownProperty {
        type_name: type_name.to_string(),
        property: property.to_string(),
    }
}

fn incompatible(property: &str, reason: String) -> SchemaError {
    SchemaError::IncompatibleMapping {
        property: property.to_string(),
        reason,
    }
}

fn check_mapping(
    catalog: &Catalog,
    owner: &TypeName,
    property: &str,
    descriptor: &Descriptor,
    mapping: &Mapping,
) -> SchemaResult<()> {
    match mapping {
        Mapping::Transform(_) => Ok(()),
        Mapping::Nested(schema) => match descriptor.element() {
            Descriptor::Reference(target) if target == schema.target() => Ok(()),
            other => Err(incompatible(
                property,
                format!("schema for '{}' cannot map {}", schema.target(), other.label()),
            )),
        },
        Mapping::Shape(shape) => {
            let (shape_owner, props) = match descriptor.element() {
                Descriptor::Literal(props) => (owner.clone(), props),
                Descriptor::Reference(target) => {
                    (target.clone(), catalog.props_of(target.as_str())?)
                }
                other => {
                    return Err(incompatible(
                        property,
                        format!("shape cannot map {}", other.label()),
                    ));
                }
            };
            for (name, inner) in shape {
                let path = format!("{property}.{name}");
                let sub = props
                    .get(name)
                    .ok_or_else(|| unknown_property(&shape_owner, &path))?;
                check_mapping(catalog, &shape_owner, &path, sub, inner)?;
            }
            Ok(())
        }
        Mapping::Each(inner) => match descriptor {
            Descriptor::Array(element) => check_mapping(catalog, owner, property, element, inner),
            other => Err(incompatible(
                property,
                format!("per-element mapping cannot map {}", other.label()),
            )),
        },
    }
}

fn check_type_mapping(catalog: &Catalog, key: &TypeKey, mapping: &Mapping) -> SchemaResult<()> {
    match (key, mapping) {
        (TypeKey::Kind(_), Mapping::Transform(_)) => Ok(()),
        (TypeKey::Kind(kind), _) => Err(incompatible(
            kind.as_str(),
            "primitive kinds only take transforms".to_string(),
        )),
        (TypeKey::Type(name), _) if !catalog.contains(name.as_str()) => {
            Err(SchemaError::UnknownType(name.to_string()))
        }
        (TypeKey::Type(name), mapping) => check_mapping(
            catalog,
            name,
            name.as_str(),
            &Descriptor::Reference(name.clone()),
            mapping,
        ),
    }
}
