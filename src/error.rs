use std::sync::Arc;

use crate::template::Scope;

/// Schema-construction failures. All of these are fatal: the schema is not
/// built and no requests are served against it.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("unknown directive `{directive}` on field `{field}`")]
    UnknownDirective { directive: String, field: String },
    #[error("malformed key template `{template}`: {reason}")]
    MalformedTemplate { template: String, reason: String },
    #[error("directive `{directive}` on field `{field}` requires argument `{argument}`")]
    MissingDirectiveArgument { directive: String, field: String, argument: String },
    #[error(
        "field `{field}` is list-shaped and requires a direct reference key, not an \
         interpolated template"
    )]
    ShapeMismatch { field: String },
    #[error("directive `{directive}` on field `{field}` references unregistered loader")]
    UnknownLoader { directive: String, field: String },
    #[error("duplicate type `{0}`")]
    DuplicateType(String),
    #[error("directive `{directive}` cannot be applied to type `{type_name}`")]
    InvalidPlacement { directive: String, type_name: String },
    #[error("schema registration failed: {0}")]
    Schema(#[from] async_graphql::dynamic::SchemaError),
}

/// Failures of a single field resolution. These surface as a field error on
/// the affected field only, sibling fields are unaffected.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("missing argument `{0}`")]
    MissingArgument(String),
    #[error("missing path `{path}` in `{scope}` scope")]
    MissingPath { scope: Scope, path: String },
    #[error("key `{0}` not found in root or args")]
    MissingKey(String),
    #[error("field `{field}`: {reason}")]
    ShapeMismatch { field: String, reason: String },
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("{source} (at {path})")]
    Traced { path: String, #[source] source: Box<ResolveError> },
    #[error("{0}")]
    Custom(String),
}

impl ResolveError {
    /// Wraps the error with the field path it surfaced at. Applied by the
    /// trace middleware, never replaces the underlying failure.
    pub fn traced(self, path: &str) -> Self {
        ResolveError::Traced { path: path.to_string(), source: Box::new(self) }
    }
}

/// Failures of a batch fetch. Cloned to every caller awaiting the batch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    #[error("batch returned {actual} values for {expected} keys")]
    BatchShapeMismatch { expected: usize, actual: usize },
    #[error("batch fetch failed: {0}")]
    Backend(Arc<anyhow::Error>),
    #[error("batch fetch aborted")]
    Aborted,
}
