//! Masks and the settle engine.

use crate::{Cover, MaskError, MaskResult, Touched};
use carnaval_model::{Catalog, Descriptor, Kind, Props};
use carnaval_types::{Map, Record, TypeName, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// A write mask over one domain type.
///
/// Masks are immutable; [`Mask::with`] and [`Mask::except`] return new ones.
/// Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Mask {
    inner: Arc<MaskInner>,
}

#[derive(Debug)]
struct MaskInner {
    catalog: Catalog,
    target: TypeName,
    props: Props,
    layers: Cover,
}

impl PartialEq for Mask {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.target == other.inner.target
                && self.inner.layers == other.inner.layers)
    }
}

impl Mask {
    /// A mask over `type_name` that protects every property.
    pub fn cover(catalog: &Catalog, type_name: impl Into<TypeName>) -> MaskResult<Mask> {
        let target = type_name.into();
        let props = catalog
            .props_of(target.as_str())
            .map_err(|_| MaskError::UnknownType(target.to_string()))?
            .clone();
        Ok(Mask {
            inner: Arc::new(MaskInner {
                catalog: catalog.clone(),
                target,
                props,
                layers: Cover::default(),
            }),
        })
    }

    pub fn target(&self) -> &TypeName {
        &self.inner.target
    }

    /// The effective visibility tree.
    pub fn layers(&self) -> &Cover {
        &self.inner.layers
    }

    /// Makes exactly the properties of `cover` writable.
    pub fn with(&self, cover: impl Into<Cover>) -> MaskResult<Mask> {
        let cover = cover.into();
        self.check(&cover)?;
        debug!(type_name = %self.inner.target, "mask covers selected properties");
        Ok(self.layered(cover))
    }

    /// Makes every property writable except those hidden by `cover`.
    ///
    /// Nested masks in `cover` are kept as they are.
    pub fn except(&self, cover: impl Into<Cover>) -> MaskResult<Mask> {
        let cover = cover.into();
        self.check(&cover)?;
        let mut path = vec![self.inner.target.clone()];
        let layers = complement(&self.inner.catalog, &self.inner.props, &cover, &mut path, None)?
            .unwrap_or_default();
        debug!(type_name = %self.inner.target, "mask covers all but excluded properties");
        Ok(self.layered(layers))
    }

    /// Writes the layered properties of `source` into `destination` and
    /// reports every protected property whose values differ.
    ///
    /// The report is empty when the source changed nothing it was not
    /// allowed to.
    pub fn settle(&self, destination: &mut Record, source: &Record) -> Touched {
        if destination.type_name() != &self.inner.target {
            warn!(
                expected = %self.inner.target,
                found = %destination.type_name(),
                "settling a record of another type"
            );
        }
        let touched = self
            .settle_fields(
                &self.inner.props,
                destination.fields_mut(),
                Some(source.fields()),
                &self.inner.layers,
            )
            .unwrap_or_default();
        debug!(
            type_name = %self.inner.target,
            touched = !touched.is_empty(),
            "settled"
        );
        touched
    }

    fn layered(&self, layers: Cover) -> Mask {
        Mask {
            inner: Arc::new(MaskInner {
                catalog: self.inner.catalog.clone(),
                target: self.inner.target.clone(),
                props: self.inner.props.clone(),
                layers,
            }),
        }
    }

    fn check(&self, cover: &Cover) -> MaskResult<()> {
        let target = &self.inner.target;
        match cover {
            Cover::Visible | Cover::Hidden => Ok(()),
            Cover::Fields(fields) => check_fields(
                &self.inner.catalog,
                target,
                &self.inner.props,
                fields,
                None,
            ),
            Cover::Mask(mask) if mask.target() == target => Ok(()),
            Cover::Mask(mask) => Err(incompatible(
                target.as_str(),
                format!("mask for '{}' cannot cover '{target}'", mask.target()),
            )),
            Cover::Each(_) => Err(incompatible(
                target.as_str(),
                "a record takes no per-item cover".to_string(),
            )),
        }
    }

    fn settle_fields(
        &self,
        props: &Props,
        destination: &mut Map,
        source: Option<&Map>,
        cover: &Cover,
    ) -> Option<Touched> {
        let mut report = BTreeMap::new();
        for (name, descriptor) in props.iter() {
            let incoming = source.and_then(|fields| fields.get(name));
            let child = cover.child(name);
            if let Some(touched) =
                self.settle_property(destination, name, incoming, descriptor, &child)
            {
                report.insert(name.to_string(), touched);
            }
        }
        (!report.is_empty()).then_some(Touched::Fields(report))
    }

    fn settle_property(
        &self,
        destination: &mut Map,
        name: &str,
        incoming: Option<&Value>,
        descriptor: &Descriptor,
        cover: &Cover,
    ) -> Option<Touched> {
        let given = incoming;
        let incoming = incoming.filter(|value| !value.is_null());
        let present = destination.get(name).is_some_and(|value| !value.is_null());
        if !present && incoming.is_none() {
            return None;
        }

        if let Descriptor::Array(element) = descriptor {
            return self.settle_array(destination, name, incoming, element, cover);
        }
        if let Cover::Mask(mask) = cover {
            return mask.delegate(destination, name, incoming);
        }

        match descriptor {
            Descriptor::Primitive(Kind::Object) => {
                self.settle_free(destination, name, incoming, cover)
            }
            Descriptor::Primitive(kind) => {
                settle_leaf(destination, name, given, cover, Some(*kind))
            }
            Descriptor::Reference(target) => {
                let props = self.inner.catalog.props_of(target.as_str()).ok()?;
                let source = incoming.and_then(Value::as_map);
                with_container(destination, name, Some(target), cover, |fields| {
                    self.settle_fields(props, fields, source, cover)
                })
            }
            Descriptor::Literal(props) => {
                let source = incoming.and_then(Value::as_map);
                with_container(destination, name, None, cover, |fields| {
                    self.settle_fields(props, fields, source, cover)
                })
            }
            Descriptor::Array(_) => None,
        }
    }

    fn delegate(
        &self,
        destination: &mut Map,
        name: &str,
        incoming: Option<&Value>,
    ) -> Option<Touched> {
        let mut holder = match destination.remove(name) {
            Some(Value::Record(record)) => record.into_fields(),
            Some(Value::Object(fields)) => fields,
            _ => Map::new(),
        };
        let touched = self.settle_fields(
            &self.inner.props,
            &mut holder,
            incoming.and_then(Value::as_map),
            &self.inner.layers,
        );
        destination.insert(
            name.to_string(),
            Value::Record(Record::with_fields(self.inner.target.clone(), holder)),
        );
        touched
    }

    /// An opaque object: every key on either side is a leaf.
    fn settle_free(
        &self,
        destination: &mut Map,
        name: &str,
        incoming: Option<&Value>,
        cover: &Cover,
    ) -> Option<Touched> {
        let current = destination.get(name).filter(|value| !value.is_null());
        if current.is_some_and(|value| value.as_map().is_none())
            || incoming.is_some_and(|value| value.as_map().is_none())
        {
            return settle_leaf(destination, name, incoming, cover, None);
        }

        let source = incoming.and_then(Value::as_map);
        let keys: BTreeSet<String> = current
            .and_then(Value::as_map)
            .into_iter()
            .chain(source)
            .flat_map(|fields| fields.keys().cloned())
            .collect();

        with_container(destination, name, None, cover, |fields| {
            let mut report = BTreeMap::new();
            for key in &keys {
                let incoming = source.and_then(|source| source.get(key));
                let child = cover.child(key);
                if let Some(touched) = settle_leaf(fields, key, incoming, &child, None) {
                    report.insert(key.clone(), touched);
                }
            }
            (!report.is_empty()).then_some(Touched::Fields(report))
        })
    }

    /// Arrays settle position by position. A layered array takes the
    /// source length; a protected one keeps its own and reports a length
    /// mismatch.
    fn settle_array(
        &self,
        destination: &mut Map,
        name: &str,
        incoming: Option<&Value>,
        element: &Descriptor,
        cover: &Cover,
    ) -> Option<Touched> {
        let sources = incoming
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let mut items = match destination.remove(name) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };

        let layered = cover.is_layered();
        let length = if layered { sources.len() } else { items.len() };
        let item_cover = cover.item();
        let mut touched = !layered && sources.len() != items.len();
        let mut report = Vec::with_capacity(length);

        for index in 0..length {
            let mut holder = Map::new();
            if let Some(item) = items.get_mut(index) {
                holder.insert(name.to_string(), std::mem::take(item));
            }
            let settled =
                self.settle_property(&mut holder, name, sources.get(index), element, item_cover);
            let value = holder.remove(name).unwrap_or(Value::Null);
            match items.get_mut(index) {
                Some(slot) => *slot = value,
                None => items.push(value),
            }
            match settled {
                Some(item) => {
                    touched = true;
                    report.push(item);
                }
                None => report.push(Touched::Unchanged),
            }
        }

        if layered {
            items.truncate(length);
        }
        destination.insert(name.to_string(), Value::Array(items));
        touched.then_some(Touched::Items(report))
    }
}

/// A primitive value: copied when layered, compared otherwise.
///
/// An explicit null in the source is copied as null; an absent source
/// removes the key.
fn settle_leaf(
    destination: &mut Map,
    name: &str,
    incoming: Option<&Value>,
    cover: &Cover,
    kind: Option<Kind>,
) -> Option<Touched> {
    if cover.is_layered() {
        match incoming {
            Some(value) => destination.insert(name.to_string(), value.clone()),
            None => destination.remove(name),
        };
        return None;
    }

    let incoming = incoming.filter(|value| !value.is_null());
    let current = destination.get(name).filter(|value| !value.is_null());
    let same = match (current, incoming) {
        (Some(current), Some(incoming)) => same_leaf(kind, current, incoming),
        (None, None) => true,
        _ => false,
    };
    if same {
        None
    } else {
        trace!(property = name, "protected value differs");
        Some(Touched::Changed)
    }
}

fn same_leaf(kind: Option<Kind>, current: &Value, incoming: &Value) -> bool {
    if kind == Some(Kind::Date) {
        if let (Some(a), Some(b)) = (instant(current), instant(incoming)) {
            return a == b;
        }
    }
    current.same_as(incoming)
}

/// Epoch millis of a date held as a date, an RFC 3339 string or a number.
fn instant(value: &Value) -> Option<i64> {
    match value {
        Value::Date(date) => Some(date.timestamp_millis()),
        Value::String(text) => Value::parse_date(text)
            .ok()
            .map(|date| date.timestamp_millis()),
        Value::Number(_) => value.as_i64(),
        _ => None,
    }
}

/// Runs `settle` on the object held at `name`.
///
/// A missing object is created when the property is layered and compared
/// against a discarded empty scratch otherwise.
fn with_container<F>(
    destination: &mut Map,
    name: &str,
    type_name: Option<&TypeName>,
    cover: &Cover,
    settle: F,
) -> Option<Touched>
where
    F: FnOnce(&mut Map) -> Option<Touched>,
{
    if let Some(fields) = destination.get_mut(name).and_then(Value::as_map_mut) {
        return settle(fields);
    }
    let mut fields = Map::new();
    let touched = settle(&mut fields);
    if cover.is_layered() {
        let value = match type_name {
            Some(type_name) => Value::Record(Record::with_fields(type_name.clone(), fields)),
            None => Value::Object(fields),
        };
        destination.insert(name.to_string(), value);
    }
    touched
}

/// The structural complement of an exclusion cover.
///
/// Leaves are visible unless explicitly hidden; nested shapes recurse and are
/// omitted when nothing inside stays visible. A type already on `path` with
/// no further exclusions is visible as a whole. Opaque objects have no
/// declared keys to complement, so exclusions inside them are rejected.
fn complement(
    catalog: &Catalog,
    props: &Props,
    exclusion: &Cover,
    path: &mut Vec<TypeName>,
    prefix: Option<&str>,
) -> MaskResult<Option<Cover>> {
    let none = Cover::default();
    let mut fields = BTreeMap::new();
    for (name, descriptor) in props.iter() {
        let at = match prefix {
            Some(prefix) => format!("{prefix}.{name}"),
            None => name.to_string(),
        };
        let entry = exclusion.entry(name).map(Cover::item);
        if matches!(entry, Some(Cover::Hidden)) {
            continue;
        }
        let nested = match entry {
            Some(cover) if matches!(cover, Cover::Fields(_)) => cover,
            _ => &none,
        };
        let cover = match (descriptor.element(), entry) {
            (_, Some(Cover::Mask(mask))) => Some(Cover::Mask(mask.clone())),
            (Descriptor::Primitive(Kind::Object), Some(Cover::Fields(inner)))
                if !inner.is_empty() =>
            {
                return Err(incompatible(
                    &at,
                    "exclusions inside an opaque object cannot be complemented".to_string(),
                ));
            }
            (Descriptor::Primitive(_), _) => Some(Cover::Visible),
            (Descriptor::Reference(target), _) => {
                let excludes = matches!(nested, Cover::Fields(inner) if !inner.is_empty());
                match catalog.props_of(target.as_str()) {
                    _ if path.contains(target) && !excludes => Some(Cover::Visible),
                    Ok(inner) => {
                        path.push(target.clone());
                        let cover = complement(catalog, inner, nested, path, Some(&at));
                        path.pop();
                        cover?
                    }
                    Err(_) => None,
                }
            }
            (Descriptor::Literal(inner), _) => {
                complement(catalog, inner, nested, path, Some(&at))?
            }
            (Descriptor::Array(_), _) => Some(Cover::Visible),
        };
        if let Some(cover) = cover {
            fields.insert(name.to_string(), cover);
        }
    }
    Ok((!fields.is_empty()).then_some(Cover::Fields(fields)))
}

fn check_fields(
    catalog: &Catalog,
    owner: &TypeName,
    props: &Props,
    fields: &BTreeMap<String, Cover>,
    prefix: Option<&str>,
) -> MaskResult<()> {
    for (name, cover) in fields {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{name}"),
            None => name.clone(),
        };
        let descriptor = props.get(name).ok_or_else(|| MaskError::UnknownProperty {
            type_name: owner.to_string(),
            property: path.clone(),
        })?;
        check_property(catalog, owner, &path, descriptor, cover)?;
    }
    Ok(())
}

fn check_property(
    catalog: &Catalog,
    owner: &TypeName,
    path: &str,
    descriptor: &Descriptor,
    cover: &Cover,
) -> MaskResult<()> {
    match cover {
        Cover::Visible | Cover::Hidden => Ok(()),
        Cover::Each(inner) => match descriptor {
            Descriptor::Array(element) => check_property(catalog, owner, path, element, inner),
            other => Err(incompatible(
                path,
                format!("per-item cover cannot cover {}", other.label()),
            )),
        },
        Cover::Mask(mask) => match descriptor.element() {
            Descriptor::Reference(target) if target == mask.target() => Ok(()),
            other => Err(incompatible(
                path,
                format!("mask for '{}' cannot cover {}", mask.target(), other.label()),
            )),
        },
        Cover::Fields(fields) => match descriptor.element() {
            Descriptor::Reference(target) => {
                let props = catalog
                    .props_of(target.as_str())
                    .map_err(|_| MaskError::UnknownType(target.to_string()))?;
                check_fields(catalog, target, props, fields, Some(path))
            }
            Descriptor::Literal(props) => check_fields(catalog, owner, props, fields, Some(path)),
            Descriptor::Primitive(Kind::Object) => Ok(()),
            other => Err(incompatible(
                path,
                format!("field covers cannot cover {}", other.label()),
            )),
        },
    }
}

fn incompatible(property: &str, reason: String) -> MaskError {
    MaskError::IncompatibleCover {
        property: property.to_string(),
        reason,
    }
}
