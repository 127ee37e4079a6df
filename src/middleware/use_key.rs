use std::sync::Arc;

use async_graphql::Value;

use super::{BindContext, BoundDirective, MiddlewareFactory, ResolverFn};
use crate::error::{BindError, ResolveError};
use crate::types::{DirectiveArgs, FieldMeta};

/// Remaps which property of the resolved value is returned: the `key`
/// argument is looked up on the inner resolver's result first, falling back
/// to the original parent value.
pub struct UseFactory;

// On a list value the remap applies element-wise, so a use directive nested
// inside a list-shaped load picks the key off every fetched element.
pub(super) fn member(value: &Value, key: &str) -> Option<Value> {
    match value {
        Value::Object(object) => object.get(key).cloned(),
        Value::List(items) => items
            .iter()
            .map(|item| member(item, key))
            .collect::<Option<Vec<_>>>()
            .map(Value::List),
        _ => None,
    }
}

impl MiddlewareFactory for UseFactory {
    fn bind(
        &self,
        args: &DirectiveArgs,
        field: &FieldMeta,
        _env: &BindContext<'_>,
    ) -> Result<BoundDirective, BindError> {
        let key = match args.get("key") {
            Some(Value::String(key)) => key.clone(),
            _ => {
                return Err(BindError::MissingDirectiveArgument {
                    directive: "use".to_string(),
                    field: field.path(),
                    argument: "key".to_string(),
                })
            }
        };

        Ok(BoundDirective::Middleware(Box::new(move |inner: ResolverFn| {
            let key = key.clone();
            Arc::new(move |scopes| {
                let key = key.clone();
                let inner = inner.clone();
                Box::pin(async move {
                    let resolved = inner(scopes.clone()).await?;
                    member(&resolved, &key)
                        .or_else(|| member(&scopes.root, &key))
                        .ok_or(ResolveError::MissingKey(key))
                })
            })
        })))
    }
}
