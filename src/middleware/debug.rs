use std::sync::Arc;

use super::{BindContext, BoundDirective, MiddlewareFactory, ObservabilityHook, ResolverFn};
use crate::error::BindError;
use crate::types::{DirectiveArgs, FieldMeta};

/// Pure passthrough with a side effect: reports the field's root and
/// arguments to the hook, then delegates. Never alters the value or the
/// failure coming back.
pub struct DebugFactory {
    hook: Arc<dyn ObservabilityHook>,
}

impl DebugFactory {
    pub fn new(hook: Arc<dyn ObservabilityHook>) -> Self {
        Self { hook }
    }
}

impl MiddlewareFactory for DebugFactory {
    fn bind(
        &self,
        _args: &DirectiveArgs,
        _field: &FieldMeta,
        _env: &BindContext<'_>,
    ) -> Result<BoundDirective, BindError> {
        let hook = self.hook.clone();
        Ok(BoundDirective::Middleware(Box::new(move |inner: ResolverFn| {
            let hook = hook.clone();
            Arc::new(move |scopes| {
                let hook = hook.clone();
                let inner = inner.clone();
                Box::pin(async move {
                    hook.field_resolving(&scopes.info, &scopes.root, &scopes.args);
                    inner(scopes).await
                })
            })
        })))
    }
}
