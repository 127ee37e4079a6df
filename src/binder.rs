use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_graphql::Value;
use tracing::debug;

use crate::error::BindError;
use crate::middleware::{
    BindContext, BoundDirective, Deprecation, DirectiveRegistry, ResolverFn,
};
use crate::types::{FieldDirective, FieldMeta};

pub(crate) const LOG_TARGET: &str = "graphql_directives::binder";

/// Result of binding one field: the composed resolver plus any build-time
/// metadata the directives attached.
pub struct BoundField {
    pub resolver: ResolverFn,
    pub deprecation: Option<Deprecation>,
}

// manual impl, the composed resolver closure has no Debug form
impl fmt::Debug for BoundField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundField")
            .field("deprecation", &self.deprecation)
            .finish_non_exhaustive()
    }
}

/// Composes a field's ordered directive list into one effective resolver.
///
/// Directives nest in declaration order with the first-declared directive as
/// the outermost wrapper, so it executes first against the original parent
/// value. A field that both loads a batched value and post-processes it must
/// therefore declare the loading directive first; the post-processing
/// directives, nested inside it, then see the loaded value as their root.
/// This ordering is contractual.
pub struct DirectiveBinder<'a> {
    registry: &'a DirectiveRegistry,
    loaders: HashSet<String>,
}

impl<'a> DirectiveBinder<'a> {
    pub fn new(registry: &'a DirectiveRegistry, loaders: HashSet<String>) -> Self {
        Self { registry, loaders }
    }

    pub fn bind_field(
        &self,
        meta: &FieldMeta,
        directives: &[FieldDirective],
        base: Option<ResolverFn>,
    ) -> Result<BoundField, BindError> {
        let mut resolver = base.unwrap_or_else(|| default_resolver(meta.field_name.clone()));
        let mut deprecation = None;
        let env = BindContext { loaders: &self.loaders };

        // reverse iteration leaves the first-declared directive outermost
        for directive in directives.iter().rev() {
            let factory = self.registry.get(&directive.name).ok_or_else(|| {
                BindError::UnknownDirective {
                    directive: directive.name.clone(),
                    field: meta.path(),
                }
            })?;
            match factory.bind(&directive.args, meta, &env)? {
                BoundDirective::Middleware(wrap) => resolver = wrap(resolver),
                BoundDirective::Deprecation(d) => deprecation = Some(d),
            }
        }

        debug!(
            target: LOG_TARGET,
            field = %meta.path(),
            directives = directives.len(),
            "Composed field resolver."
        );
        Ok(BoundField { resolver, deprecation })
    }
}

/// Base resolver that returns its root unchanged. The usual innermost layer
/// for load-style fields, whose root is already the value to return.
pub fn identity_resolver() -> ResolverFn {
    Arc::new(|scopes| Box::pin(async move { Ok(scopes.root) }))
}

/// Default base resolver: the parent object's member of the field's name,
/// `Null` when the parent has no such member.
pub fn default_resolver(field_name: String) -> ResolverFn {
    Arc::new(move |scopes| {
        let field_name = field_name.clone();
        Box::pin(async move {
            match &scopes.root {
                Value::Object(object) => {
                    Ok(object.get(field_name.as_str()).cloned().unwrap_or(Value::Null))
                }
                _ => Ok(Value::Null),
            }
        })
    })
}
