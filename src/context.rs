use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::Value;
use tracing::debug;

use crate::loader::{BatchFn, BatchLoadCache};
use crate::types::{FieldMeta, FieldShape, ValueMapping};

pub(crate) const LOG_TARGET: &str = "graphql_directives::context";

/// Execution metadata of the field being resolved. Known entirely at
/// schema-build time, the binder captures one instance per composed field.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub parent_type: String,
    pub field_name: String,
    pub path: String,
    pub shape: FieldShape,
}

impl FieldInfo {
    pub fn new(meta: &FieldMeta) -> Self {
        Self {
            parent_type: meta.type_name.clone(),
            field_name: meta.field_name.clone(),
            path: meta.path(),
            shape: meta.shape,
        }
    }

    /// Key-template lookups into the `info` scope.
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            "fieldName" => Some(Value::from(self.field_name.clone())),
            "parentType" => Some(Value::from(self.parent_type.clone())),
            "path" => Some(Value::from(self.path.clone())),
            _ => None,
        }
    }
}

/// The four runtime scopes handed to every composed resolver: the parent
/// value, the field's bound arguments, the request context and the field's
/// execution metadata. Cheap to clone, middleware passes it down the stack.
#[derive(Clone)]
pub struct Scopes {
    pub root: Value,
    pub args: ValueMapping,
    pub context: Arc<RequestContext>,
    pub info: Arc<FieldInfo>,
}

impl Scopes {
    /// Replaces the parent value, used by load-style middleware to hand the
    /// fetched value to the resolvers nested inside it.
    pub fn with_root(&self, root: Value) -> Self {
        Self { root, args: self.args.clone(), context: self.context.clone(), info: self.info.clone() }
    }
}

/// Request-scoped shared state: one fresh [`BatchLoadCache`] per registered
/// loader plus caller-supplied values. Owned by exactly one operation and
/// dropped with it, so no cache entry ever leaks across requests.
pub struct RequestContext {
    loaders: HashMap<String, BatchLoadCache>,
    values: ValueMapping,
}

impl RequestContext {
    pub fn loader(&self, name: &str) -> Option<&BatchLoadCache> {
        self.loaders.get(name)
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

/// Produces one [`RequestContext`] per operation. Holds the batch functions
/// registered at schema-build time; the caches themselves are constructed
/// fresh on every `create` call.
#[derive(Clone)]
pub struct ContextFactory {
    fetchers: HashMap<String, BatchFn>,
    base_values: ValueMapping,
}

impl ContextFactory {
    pub(crate) fn new(fetchers: HashMap<String, BatchFn>) -> Self {
        Self { fetchers, base_values: ValueMapping::new() }
    }

    /// Values shared by every request context created from this factory.
    pub fn with_values(mut self, values: ValueMapping) -> Self {
        self.base_values = values;
        self
    }

    pub fn create(&self) -> RequestContext {
        self.create_with(ValueMapping::new())
    }

    /// Creates a fresh context with additional request-scoped values merged
    /// over the factory's base values.
    pub fn create_with(&self, values: ValueMapping) -> RequestContext {
        debug!(target: LOG_TARGET, loaders = self.fetchers.len(), "Creating request context.");
        let loaders = self
            .fetchers
            .iter()
            .map(|(name, fetch)| (name.clone(), BatchLoadCache::new(fetch.clone())))
            .collect();

        let mut merged = self.base_values.clone();
        merged.extend(values);

        RequestContext { loaders, values: merged }
    }
}
