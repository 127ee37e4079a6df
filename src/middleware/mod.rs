pub mod debug;
pub mod deprecate;
pub mod load;
pub mod stack;
pub mod trace;
pub mod use_key;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_graphql::Value;
use futures_util::future::BoxFuture;
use tracing::{debug, error};

use crate::context::{FieldInfo, Scopes};
use crate::error::{BindError, ResolveError};
use crate::types::{DirectiveArgs, FieldMeta, ValueMapping};

pub use self::debug::DebugFactory;
pub use self::deprecate::{Deprecation, DeprecateFactory};
pub use self::load::LoadFactory;
pub use self::stack::{StackFactory, StackStep};
pub use self::trace::TraceFactory;
pub use self::use_key::UseFactory;

pub(crate) const LOG_TARGET: &str = "graphql_directives::middleware";

/// A field's effective resolver. Built once at schema-build time, invoked
/// per resolution with the four runtime scopes.
pub type ResolverFn =
    Arc<dyn Fn(Scopes) -> BoxFuture<'static, Result<Value, ResolveError>> + Send + Sync>;

/// Builds a [`ResolverFn`] from an async closure.
pub fn resolver_fn<F, Fut>(f: F) -> ResolverFn
where
    F: Fn(Scopes) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Value, ResolveError>> + Send + 'static,
{
    Arc::new(move |scopes| Box::pin(f(scopes)))
}

/// A resolver transformation, the runtime form of one directive.
pub type WrapFn = Box<dyn Fn(ResolverFn) -> ResolverFn + Send + Sync>;

/// What binding one directive annotation produced: either a resolver
/// transformation or build-time-only field metadata.
pub enum BoundDirective {
    Middleware(WrapFn),
    Deprecation(Deprecation),
}

/// Build-time environment handed to factories, currently the names of the
/// registered loaders so load-style directives fail at construction instead
/// of at first resolution.
pub struct BindContext<'a> {
    pub loaders: &'a HashSet<String>,
}

/// Produces the bound form of a directive from its declared arguments.
/// Factories are plain values in a name-keyed registry; dispatch is by
/// directive name, not inheritance.
pub trait MiddlewareFactory: Send + Sync {
    fn bind(
        &self,
        args: &DirectiveArgs,
        field: &FieldMeta,
        env: &BindContext<'_>,
    ) -> Result<BoundDirective, BindError>;
}

/// Observer for the side-effecting middleware (debug, trace). Injected at
/// registry construction instead of writing to a process-wide sink.
pub trait ObservabilityHook: Send + Sync {
    fn field_resolving(&self, info: &FieldInfo, root: &Value, args: &ValueMapping);
    fn field_failed(&self, info: &FieldInfo, error: &ResolveError);
}

/// Default hook, emits `tracing` events.
#[derive(Debug, Default)]
pub struct TracingHook;

impl ObservabilityHook for TracingHook {
    fn field_resolving(&self, info: &FieldInfo, root: &Value, args: &ValueMapping) {
        debug!(
            target: LOG_TARGET,
            field = %info.path,
            root = %root,
            args = ?args,
            "Resolving field."
        );
    }

    fn field_failed(&self, info: &FieldInfo, error: &ResolveError) {
        error!(target: LOG_TARGET, field = %info.path, error = %error, "Field resolution failed.");
    }
}

/// Name-keyed registry of directive factories consulted by the binder. An
/// annotation whose name is not registered is fatal at schema construction.
pub struct DirectiveRegistry {
    factories: HashMap<String, Box<dyn MiddlewareFactory>>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self { factories: HashMap::new() }
    }

    /// Registry preloaded with the argument-only directives: `deprecated`,
    /// `log`, `use` and `trace`. Load and stack directives carry
    /// construction-time state and are registered by the caller.
    pub fn with_defaults(hook: Arc<dyn ObservabilityHook>) -> Self {
        let mut registry = Self::new();
        registry.register("deprecated", Box::new(DeprecateFactory::default()));
        registry.register("log", Box::new(DebugFactory::new(hook.clone())));
        registry.register("use", Box::new(UseFactory));
        registry.register("trace", Box::new(TraceFactory::new(hook)));
        registry
    }

    pub fn register(&mut self, name: &str, factory: Box<dyn MiddlewareFactory>) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn get(&self, name: &str) -> Option<&dyn MiddlewareFactory> {
        self.factories.get(name).map(Box::as_ref)
    }
}

impl Default for DirectiveRegistry {
    fn default() -> Self {
        Self::new()
    }
}
