use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, Object, Schema};
use async_graphql::Value;
use tracing::debug;

use crate::binder::DirectiveBinder;
use crate::context::{ContextFactory, FieldInfo, RequestContext, Scopes};
use crate::error::BindError;
use crate::loader::BatchFn;
use crate::middleware::{
    BindContext, BoundDirective, DirectiveRegistry, LoadFactory, MiddlewareFactory, ResolverFn,
    TracingHook,
};
use crate::types::{FieldMeta, FieldShape, TypeDef};

pub(crate) const LOG_TARGET: &str = "graphql_directives::schema";

/// Build-time metadata collected from non-resolver directives, keyed by
/// `Type` or `Type.field`. The server can surface these alongside the
/// executable schema.
#[derive(Debug, Default)]
pub struct SchemaAnnotations {
    pub deprecated: HashMap<String, String>,
}

/// Everything `build` produces: the executable schema, the per-operation
/// context factory and the collected annotations.
pub struct SchemaBundle {
    pub schema: Schema,
    pub context: ContextFactory,
    pub annotations: SchemaAnnotations,
}

// manual impl, the executable schema and the factory's batch fns have no
// Debug form
impl fmt::Debug for SchemaBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaBundle")
            .field("annotations", &self.annotations)
            .finish_non_exhaustive()
    }
}

/// Wires type declarations, base resolvers, directive factories and batch
/// loaders into one executable dynamic schema. The schema is built
/// dynamically because the effective resolver of every field depends on the
/// directive annotations only known from the declarations handed in here.
pub struct SchemaAssembly {
    query_type: String,
    types: Vec<TypeDef>,
    registry: DirectiveRegistry,
    fetchers: HashMap<String, BatchFn>,
    resolvers: HashMap<(String, String), ResolverFn>,
}

impl SchemaAssembly {
    pub fn new(query_type: &str) -> Self {
        Self {
            query_type: query_type.to_string(),
            types: Vec::new(),
            registry: DirectiveRegistry::with_defaults(Arc::new(TracingHook)),
            fetchers: HashMap::new(),
            resolvers: HashMap::new(),
        }
    }

    /// Replaces the preloaded default registry, for callers that inject
    /// their own observability hook or directive set.
    pub fn with_registry(mut self, registry: DirectiveRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn object(mut self, type_def: TypeDef) -> Self {
        self.types.push(type_def);
        self
    }

    pub fn directive(mut self, name: &str, factory: Box<dyn MiddlewareFactory>) -> Self {
        self.registry.register(name, factory);
        self
    }

    /// Registers a batch-fetch function under `name` and a load directive of
    /// the same name resolving through it. Every request context created by
    /// the built factory carries a fresh cache for it.
    pub fn loader(mut self, name: &str, batch: BatchFn) -> Self {
        self.fetchers.insert(name.to_string(), batch);
        self.registry.register(name, Box::new(LoadFactory::new(name)));
        self
    }

    /// Custom base resolver for one field, the innermost layer of that
    /// field's composed resolver.
    pub fn resolver(mut self, type_name: &str, field_name: &str, resolver: ResolverFn) -> Self {
        self.resolvers.insert((type_name.to_string(), field_name.to_string()), resolver);
        self
    }

    pub fn build(self) -> Result<SchemaBundle, BindError> {
        let mut seen = HashSet::new();
        for type_def in &self.types {
            if !seen.insert(type_def.name.clone()) {
                return Err(BindError::DuplicateType(type_def.name.clone()));
            }
        }

        let loader_names: HashSet<String> = self.fetchers.keys().cloned().collect();
        let binder = DirectiveBinder::new(&self.registry, loader_names.clone());
        let mut annotations = SchemaAnnotations::default();
        let mut schema_builder = Schema::build(self.query_type.as_str(), None, None);

        for type_def in &self.types {
            self.bind_type_directives(type_def, &loader_names, &mut annotations)?;

            let mut object = Object::new(type_def.name.as_str());
            for field_def in &type_def.fields {
                let shape = FieldShape::of(&field_def.ty);
                let meta = FieldMeta::new(&type_def.name, &field_def.name, shape);
                let base = self
                    .resolvers
                    .get(&(type_def.name.clone(), field_def.name.clone()))
                    .cloned();
                let bound = binder.bind_field(&meta, &field_def.directives, base)?;

                let info = Arc::new(FieldInfo::new(&meta));
                let resolver = bound.resolver.clone();
                let mut field =
                    Field::new(field_def.name.clone(), field_def.ty.clone(), move |ctx| {
                        let resolver = resolver.clone();
                        let info = info.clone();
                        FieldFuture::new(async move {
                            let root = match ctx.parent_value.try_to_value() {
                                Ok(value) => value.clone(),
                                Err(_) => Value::Null,
                            };
                            let context = ctx.data::<Arc<RequestContext>>()?.clone();
                            let scopes = Scopes {
                                root,
                                args: ctx.args.as_index_map().clone(),
                                context,
                                info,
                            };
                            match resolver(scopes).await {
                                Ok(Value::Null) => Ok(None),
                                Ok(value) => Ok(Some(FieldValue::value(value))),
                                Err(e) => Err(async_graphql::Error::new(e.to_string())),
                            }
                        })
                    });

                for (name, ty) in &field_def.arguments {
                    field = field.argument(InputValue::new(name.as_str(), ty.clone()));
                }
                if let Some(deprecation) = bound.deprecation {
                    field = field.deprecation(Some(&deprecation.reason));
                    annotations.deprecated.insert(meta.path(), deprecation.reason);
                }

                object = object.field(field);
            }
            schema_builder = schema_builder.register(object);
        }

        let schema = schema_builder.finish()?;
        debug!(
            target: LOG_TARGET,
            types = self.types.len(),
            loaders = self.fetchers.len(),
            "Built executable schema."
        );

        Ok(SchemaBundle {
            schema,
            context: ContextFactory::new(self.fetchers),
            annotations,
        })
    }

    // Type-level directives carry no resolver to wrap; only metadata-style
    // directives are valid here.
    fn bind_type_directives(
        &self,
        type_def: &TypeDef,
        loaders: &HashSet<String>,
        annotations: &mut SchemaAnnotations,
    ) -> Result<(), BindError> {
        let meta = FieldMeta::new(&type_def.name, "", FieldShape::Scalar);
        let env = BindContext { loaders };
        for directive in &type_def.directives {
            let factory = self.registry.get(&directive.name).ok_or_else(|| {
                BindError::UnknownDirective {
                    directive: directive.name.clone(),
                    field: meta.path(),
                }
            })?;
            match factory.bind(&directive.args, &meta, &env)? {
                BoundDirective::Deprecation(deprecation) => {
                    annotations.deprecated.insert(type_def.name.clone(), deprecation.reason);
                }
                BoundDirective::Middleware(_) => {
                    return Err(BindError::InvalidPlacement {
                        directive: directive.name.clone(),
                        type_name: type_def.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
