use std::sync::Arc;

use async_graphql::Value;
use tracing::debug;

use super::{BindContext, BoundDirective, MiddlewareFactory, ResolverFn, LOG_TARGET};
use crate::error::{BindError, ResolveError};
use crate::template::KeySpec;
use crate::types::{DirectiveArgs, FieldMeta};

/// Wraps a field's resolver so its root value comes from a [`BatchLoadCache`]
/// lookup instead of the parent object: the key is evaluated from the
/// directive's template/scope arguments, fetched through the request's cache
/// for the named loader, and the fetched value becomes the `root` handed to
/// everything nested inside this directive.
///
/// [`BatchLoadCache`]: crate::loader::BatchLoadCache
pub struct LoadFactory {
    loader: String,
}

impl LoadFactory {
    pub fn new(loader: &str) -> Self {
        Self { loader: loader.to_string() }
    }
}

impl MiddlewareFactory for LoadFactory {
    fn bind(
        &self,
        args: &DirectiveArgs,
        field: &FieldMeta,
        env: &BindContext<'_>,
    ) -> Result<BoundDirective, BindError> {
        if !env.loaders.contains(&self.loader) {
            return Err(BindError::UnknownLoader {
                directive: self.loader.clone(),
                field: field.path(),
            });
        }

        let spec = KeySpec::from_directive_args(&self.loader, args, field)?;
        spec.validate_shape(field)?;

        let loader = self.loader.clone();
        let field = field.clone();
        Ok(BoundDirective::Middleware(Box::new(move |inner: ResolverFn| {
            let spec = spec.clone();
            let loader = loader.clone();
            let field = field.clone();
            Arc::new(move |scopes| {
                let spec = spec.clone();
                let loader = loader.clone();
                let field = field.clone();
                let inner = inner.clone();
                Box::pin(async move {
                    let key = spec.evaluate(&scopes)?;
                    let cache = scopes.context.loader(&loader).ok_or_else(|| {
                        ResolveError::Custom(format!("loader `{loader}` not registered"))
                    })?;

                    let fetched = if field.shape.is_list() {
                        let Value::List(keys) = key else {
                            return Err(ResolveError::ShapeMismatch {
                                field: field.path(),
                                reason: format!(
                                    "list field requires a list-shaped key, got `{key}`"
                                ),
                            });
                        };
                        Value::List(cache.load_many(keys).await?)
                    } else {
                        if matches!(key, Value::List(_)) {
                            return Err(ResolveError::ShapeMismatch {
                                field: field.path(),
                                reason: "non-list field resolved a list-shaped key".to_string(),
                            });
                        }
                        cache.load(key).await?
                    };

                    debug!(target: LOG_TARGET, field = %field.path(), "Loaded batched value.");
                    inner(scopes.with_root(fetched)).await
                })
            })
        })))
    }
}
