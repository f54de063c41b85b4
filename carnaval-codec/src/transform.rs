//! Property overrides: transforms, nested schemas, shapes and hooks.

use crate::{CodecResult, Providers, Schema};
use carnaval_model::Kind;
use carnaval_types::{TypeName, Value};
use futures::future::{self, BoxFuture, FutureExt};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Future returned by a transform function.
pub type TransformFuture = BoxFuture<'static, CodecResult<Value>>;

/// Future returned by a middleware.
pub type HookFuture = BoxFuture<'static, CodecResult<Option<Value>>>;

/// Encode or decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Encode,
    Decode,
}

/// A value transform: `(value, source object, providers) -> value`.
///
/// The source object is the object that holds the property being mapped.
#[derive(Clone)]
pub struct TransformFn(Arc<dyn Fn(Value, &Value, &Providers) -> TransformFuture + Send + Sync>);

impl TransformFn {
    /// Wraps a synchronous function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value, &Value, &Providers) -> CodecResult<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(
            move |value: Value, source: &Value, providers: &Providers| {
                future::ready(f(value, source, providers)).boxed()
            },
        ))
    }

    /// Wraps an async function. The source object and providers are passed
    /// by value so the returned future can outlive the call.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Value, Value, Providers) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CodecResult<Value>> + Send + 'static,
    {
        Self(Arc::new(
            move |value: Value, source: &Value, providers: &Providers| {
                f(value, source.clone(), providers.clone()).boxed()
            },
        ))
    }

    pub fn call(&self, value: Value, source: &Value, providers: &Providers) -> TransformFuture {
        (self.0)(value, source, providers)
    }
}

impl fmt::Debug for TransformFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TransformFn")
    }
}

/// How one direction of a transform behaves.
#[derive(Debug, Clone, Default)]
pub enum Access {
    /// Identity plus normalization.
    #[default]
    Default,
    /// The property is skipped in this direction.
    Hidden,
    /// The property is produced by a function.
    Fn(TransformFn),
}

impl Access {
    pub fn is_hidden(&self) -> bool {
        matches!(self, Access::Hidden)
    }
}

/// A scalar property override: `get` applies on encode, `set` on decode,
/// `alias` renames the property on the wire.
#[derive(Debug, Clone, Default)]
pub struct Transform {
    pub alias: Option<String>,
    pub get: Access,
    pub set: Access,
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renames the property on the wire.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Sets the encode function.
    pub fn get<F>(mut self, f: F) -> Self
    where
        F: Fn(Value, &Value, &Providers) -> CodecResult<Value> + Send + Sync + 'static,
    {
        self.get = Access::Fn(TransformFn::new(f));
        self
    }

    /// Sets an async encode function.
    pub fn get_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value, Value, Providers) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CodecResult<Value>> + Send + 'static,
    {
        self.get = Access::Fn(TransformFn::from_async(f));
        self
    }

    /// Sets the decode function.
    pub fn set<F>(mut self, f: F) -> Self
    where
        F: Fn(Value, &Value, &Providers) -> CodecResult<Value> + Send + Sync + 'static,
    {
        self.set = Access::Fn(TransformFn::new(f));
        self
    }

    /// Sets an async decode function.
    pub fn set_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value, Value, Providers) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CodecResult<Value>> + Send + 'static,
    {
        self.set = Access::Fn(TransformFn::from_async(f));
        self
    }

    /// Never encode the property.
    pub fn without_get(mut self) -> Self {
        self.get = Access::Hidden;
        self
    }

    /// Never decode the property.
    pub fn without_set(mut self) -> Self {
        self.set = Access::Hidden;
        self
    }

    pub(crate) fn access(&self, direction: Direction) -> &Access {
        match direction {
            Direction::Encode => &self.get,
            Direction::Decode => &self.set,
        }
    }
}

/// Override attached to a property.
#[derive(Debug, Clone)]
pub enum Mapping {
    /// Scalar transform. On an array property it applies to every item.
    Transform(Transform),
    /// Delegate to a child schema, hooks and configuration included.
    Nested(Schema),
    /// Per-sub-property overrides of a literal shape or reference.
    Shape(BTreeMap<String, Mapping>),
    /// Per-element override of an array property.
    Each(Box<Mapping>),
}

impl Mapping {
    /// Builds a shape override from `(property, mapping)` pairs.
    pub fn shape<K, M>(entries: impl IntoIterator<Item = (K, M)>) -> Self
    where
        K: Into<String>,
        M: Into<Mapping>,
    {
        Mapping::Shape(
            entries
                .into_iter()
                .map(|(key, mapping)| (key.into(), mapping.into()))
                .collect(),
        )
    }

    pub fn each(mapping: impl Into<Mapping>) -> Self {
        Mapping::Each(Box::new(mapping.into()))
    }

    /// Wire name override, if any.
    pub fn alias(&self) -> Option<&str> {
        match self {
            Mapping::Transform(transform) => transform.alias.as_deref(),
            Mapping::Each(inner) => inner.alias(),
            Mapping::Nested(_) | Mapping::Shape(_) => None,
        }
    }

    pub(crate) fn allows(&self, direction: Direction) -> bool {
        match self {
            Mapping::Transform(transform) => !transform.access(direction).is_hidden(),
            Mapping::Each(inner) => inner.allows(direction),
            Mapping::Nested(_) | Mapping::Shape(_) => true,
        }
    }
}

impl From<Transform> for Mapping {
    fn from(transform: Transform) -> Self {
        Mapping::Transform(transform)
    }
}

impl From<Schema> for Mapping {
    fn from(schema: Schema) -> Self {
        Mapping::Nested(schema)
    }
}

/// Key of a type-wide default override.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Kind(Kind),
    Type(TypeName),
}

impl From<Kind> for TypeKey {
    fn from(kind: Kind) -> Self {
        TypeKey::Kind(kind)
    }
}

impl From<TypeName> for TypeKey {
    fn from(name: TypeName) -> Self {
        TypeKey::Type(name)
    }
}

/// One entry of a selection: a property name, optionally with an override.
#[derive(Debug, Clone)]
pub struct Selector {
    pub name: String,
    pub mapping: Option<Mapping>,
}

impl Selector {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mapping: None,
        }
    }

    pub fn mapped(name: impl Into<String>, mapping: impl Into<Mapping>) -> Self {
        Self {
            name: name.into(),
            mapping: Some(mapping.into()),
        }
    }
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Selector::new(name)
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        Selector::new(name)
    }
}

impl<M: Into<Mapping>> From<(&str, M)> for Selector {
    fn from((name, mapping): (&str, M)) -> Self {
        Selector::mapped(name, mapping)
    }
}

/// A hook run before or after traversal.
///
/// Receives `(current, original, providers)` where `original` is the value
/// handed to the codec before any hook ran. Returning `Ok(None)` keeps
/// `current`; `Ok(Some(v))` replaces it.
#[derive(Clone)]
pub struct Middleware(Arc<dyn Fn(Value, &Value, &Providers) -> HookFuture + Send + Sync>);

impl Middleware {
    /// Wraps a synchronous hook.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &Value, &Providers) -> CodecResult<Option<Value>> + Send + Sync + 'static,
    {
        Self(Arc::new(
            move |current: Value, original: &Value, providers: &Providers| {
                future::ready(f(&current, original, providers)).boxed()
            },
        ))
    }

    /// Wraps an async hook.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Value, Value, Providers) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CodecResult<Option<Value>>> + Send + 'static,
    {
        Self(Arc::new(
            move |current: Value, original: &Value, providers: &Providers| {
                f(current, original.clone(), providers.clone()).boxed()
            },
        ))
    }

    pub fn call(&self, current: Value, original: &Value, providers: &Providers) -> HookFuture {
        (self.0)(current, original, providers)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Middleware")
    }
}
