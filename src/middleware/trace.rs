use std::sync::Arc;

use super::{BindContext, BoundDirective, MiddlewareFactory, ObservabilityHook, ResolverFn};
use crate::error::BindError;
use crate::types::{DirectiveArgs, FieldMeta};

/// Passthrough that tags failures with the field's path before re-raising
/// them. Never swallows a failure and never touches a successful value.
pub struct TraceFactory {
    hook: Arc<dyn ObservabilityHook>,
}

impl TraceFactory {
    pub fn new(hook: Arc<dyn ObservabilityHook>) -> Self {
        Self { hook }
    }
}

impl MiddlewareFactory for TraceFactory {
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
                    match inner(scopes.clone()).await {
                        Ok(value) => Ok(value),
                        Err(error) => {
                            let traced = error.traced(&scopes.info.path);
                            hook.field_failed(&scopes.info, &traced);
                            Err(traced)
                        }
                    }
                })
            })
        })))
    }
}
