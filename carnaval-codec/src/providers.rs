//! Named helper functions injected into transforms and hooks.

use crate::{CodecError, CodecResult};
use carnaval_types::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

type ProviderFn = Arc<dyn Fn(Value) -> CodecResult<Value> + Send + Sync>;

/// A bag of named helpers, cheap to clone.
///
/// Every transform and hook receives the providers of the call, so shared
/// services (lookups, id generators, formatters) do not need to be captured
/// in each closure.
#[derive(Clone, Default)]
pub struct Providers {
    helpers: Arc<BTreeMap<String, ProviderFn>>,
}

impl Providers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with `name` bound to `helper`.
    pub fn with<F>(&self, name: impl Into<String>, helper: F) -> Self
    where
        F: Fn(Value) -> CodecResult<Value> + Send + Sync + 'static,
    {
        let mut helpers = (*self.helpers).clone();
        helpers.insert(name.into(), Arc::new(helper));
        Self {
            helpers: Arc::new(helpers),
        }
    }

    /// Calls a helper by name.
    pub fn call(&self, name: &str, value: Value) -> CodecResult<Value> {
        let helper = self
            .helpers
            .get(name)
            .ok_or_else(|| CodecError::UnknownProvider(name.to_string()))?;
        helper(value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.helpers.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.helpers.is_empty()
    }
}

impl fmt::Debug for Providers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Providers")
            .field("names", &self.helpers.keys().collect::<Vec<_>>())
            .finish()
    }
}
