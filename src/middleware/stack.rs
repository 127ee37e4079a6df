use std::sync::Arc;

use async_graphql::Value;
use futures_util::future::BoxFuture;

use super::use_key::member;
use super::{BindContext, BoundDirective, MiddlewareFactory, ObservabilityHook, ResolverFn};
use crate::context::Scopes;
use crate::error::{BindError, ResolveError};
use crate::types::{DirectiveArgs, FieldMeta};

/// One step of an explicit stack. Unlike a wrapping middleware, a step
/// receives the previous step's output as its own channel, distinct from
/// `scopes.root`, which keeps the original parent value visible to every
/// step.
pub type StackStep =
    Arc<dyn Fn(Value, Scopes) -> BoxFuture<'static, Result<Value, ResolveError>> + Send + Sync>;

/// Builds a [`StackStep`] from an async closure.
pub fn stack_step<F, Fut>(f: F) -> StackStep
where
    F: Fn(Value, Scopes) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Value, ResolveError>> + Send + 'static,
{
    Arc::new(move |previous, scopes| Box::pin(f(previous, scopes)))
}

/// Step form of the `use` remap: picks `key` off the previous result,
/// falling back to the original parent value.
pub fn use_step(key: &str) -> StackStep {
    let key = key.to_string();
    stack_step(move |previous, scopes| {
        let key = key.clone();
        async move {
            member(&previous, &key)
                .or_else(|| member(&scopes.root, &key))
                .ok_or(ResolveError::MissingKey(key))
        }
    })
}

/// Step form of the debug passthrough: reports and hands the previous
/// result on unchanged.
pub fn debug_step(hook: Arc<dyn ObservabilityHook>) -> StackStep {
    stack_step(move |previous, scopes| {
        let hook = hook.clone();
        async move {
            hook.field_resolving(&scopes.info, &scopes.root, &scopes.args);
            Ok(previous)
        }
    })
}

/// Explicit ordered composition declared as one directive: the inner
/// resolver's value is threaded through every step in declaration order.
pub struct StackFactory {
    steps: Vec<StackStep>,
}

impl StackFactory {
    pub fn new(steps: Vec<StackStep>) -> Self {
        Self { steps }
    }
}

impl MiddlewareFactory for StackFactory {
    fn bind(
        &self,
        _args: &DirectiveArgs,
        _field: &FieldMeta,
        _env: &BindContext<'_>,
    ) -> Result<BoundDirective, BindError> {
        let steps = self.steps.clone();
        Ok(BoundDirective::Middleware(Box::new(move |inner: ResolverFn| {
            let steps = steps.clone();
            Arc::new(move |scopes| {
                let steps = steps.clone();
                let inner = inner.clone();
                Box::pin(async move {
                    let mut value = inner(scopes.clone()).await?;
                    for step in &steps {
                        value = step(value, scopes.clone()).await?;
                    }
                    Ok(value)
                })
            })
        })))
    }
}
