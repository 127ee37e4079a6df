use async_graphql::dynamic::TypeRef;
use async_graphql::{Name, Value};
use indexmap::IndexMap;

// ValueMapping is the object form of `Value` used for roots, arguments and
// request-scoped context values. DirectiveArgs are the named arguments of a
// single directive annotation. Both are plain IndexMaps so declaration order
// is preserved.
pub type ValueMapping = IndexMap<Name, Value>;
pub type DirectiveArgs = IndexMap<Name, Value>;

/// Declared return shape of a field, NonNull-transparent. Drives whether a
/// load directive issues `load` or `load_many`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Scalar,
    List,
}

impl FieldShape {
    pub fn of(ty: &TypeRef) -> Self {
        match ty {
            TypeRef::List(_) => FieldShape::List,
            TypeRef::NonNull(inner) => FieldShape::of(inner),
            _ => FieldShape::Scalar,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, FieldShape::List)
    }
}

/// A single directive annotation as declared on a field or type. Order of
/// annotations is significant and fixed once the schema is built.
#[derive(Debug, Clone)]
pub struct FieldDirective {
    pub name: String,
    pub args: DirectiveArgs,
}

impl FieldDirective {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), args: DirectiveArgs::new() }
    }

    pub fn arg(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.args.insert(Name::new(name), value.into());
        self
    }
}

/// Field declaration: name, return type, declared arguments and the ordered
/// directive list the binder composes into one resolver.
#[derive(Debug)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeRef,
    pub arguments: Vec<(String, TypeRef)>,
    pub directives: Vec<FieldDirective>,
}

impl FieldDef {
    pub fn new(name: &str, ty: TypeRef) -> Self {
        Self { name: name.to_string(), ty, arguments: Vec::new(), directives: Vec::new() }
    }

    pub fn argument(mut self, name: &str, ty: TypeRef) -> Self {
        self.arguments.push((name.to_string(), ty));
        self
    }

    pub fn directive(mut self, directive: FieldDirective) -> Self {
        self.directives.push(directive);
        self
    }
}

#[derive(Debug)]
pub struct TypeDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
    pub directives: Vec<FieldDirective>,
}

impl TypeDef {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), fields: Vec::new(), directives: Vec::new() }
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn directive(mut self, directive: FieldDirective) -> Self {
        self.directives.push(directive);
        self
    }
}

/// Build-time identity of a field, handed to middleware factories so bind
/// errors and traces can name the exact field.
#[derive(Debug, Clone)]
pub struct FieldMeta {
    pub type_name: String,
    pub field_name: String,
    pub shape: FieldShape,
}

impl FieldMeta {
    pub fn new(type_name: &str, field_name: &str, shape: FieldShape) -> Self {
        Self { type_name: type_name.to_string(), field_name: field_name.to_string(), shape }
    }

    pub fn path(&self) -> String {
        if self.field_name.is_empty() {
            return self.type_name.clone();
        }
        format!("{}.{}", self.type_name, self.field_name)
    }
}
