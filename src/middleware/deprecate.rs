use async_graphql::Value;

use super::{BindContext, BoundDirective, MiddlewareFactory};
use crate::error::BindError;
use crate::types::{DirectiveArgs, FieldMeta};

/// GraphQL's own default deprecation reason.
pub const DEFAULT_REASON: &str = "No longer supported";

/// Static deprecation metadata attached at schema-build time. Has no runtime
/// resolution effect; the assembly surfaces it through the built field's
/// deprecation and the schema annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deprecation {
    pub reason: String,
}

/// Binds the `deprecated` directive: reads the optional `reason` argument,
/// defaulting it, and yields metadata instead of a resolver transformation.
pub struct DeprecateFactory {
    default_reason: String,
}

impl DeprecateFactory {
    pub fn new(default_reason: &str) -> Self {
        Self { default_reason: default_reason.to_string() }
    }
}

impl Default for DeprecateFactory {
    fn default() -> Self {
        Self::new(DEFAULT_REASON)
    }
}

impl MiddlewareFactory for DeprecateFactory {
    fn bind(
        &self,
        args: &DirectiveArgs,
        _field: &FieldMeta,
        _env: &BindContext<'_>,
    ) -> Result<BoundDirective, BindError> {
        let reason = match args.get("reason") {
            Some(Value::String(reason)) => reason.clone(),
            _ => self.default_reason.clone(),
        };
        Ok(BoundDirective::Deprecation(Deprecation { reason }))
    }
}
