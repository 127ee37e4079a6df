use std::fmt;

use async_graphql::Value;

use crate::context::Scopes;
use crate::error::{BindError, ResolveError};
use crate::types::{DirectiveArgs, FieldMeta};

/// The four runtime scopes a placeholder can name explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Root,
    Args,
    Context,
    Info,
}

impl Scope {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "root" => Some(Scope::Root),
            "args" => Some(Scope::Args),
            "context" => Some(Scope::Context),
            "info" => Some(Scope::Info),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scope::Root => "root",
            Scope::Args => "args",
            Scope::Context => "context",
            Scope::Info => "info",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    /// `{$name}`, strictly from the field arguments.
    Argument(String),
    /// `{scope.a.b}`, a dotted path walked in the named scope only.
    Scoped { scope: Scope, path: Vec<String> },
    /// `{name}`, looked up in root first, then args.
    Bare(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// A directive's lookup-key description, parsed once at schema-build time
/// and evaluated statelessly against the scopes on every resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum KeySpec {
    /// Literal key from the directive's `id` argument.
    Constant(Value),
    /// Direct scope reference, resolves to the value's native type so a
    /// list-valued lookup stays an ordered list instead of a string.
    Direct { scope: Scope, path: Vec<String> },
    /// Interpolated template, resolves to a string key. A template that is
    /// exactly one placeholder also preserves the native type.
    Template(Vec<Segment>),
}

impl KeySpec {
    /// Parses a `{...}` template string. Unbalanced braces, empty
    /// placeholders and dotted paths outside the four scopes fail here,
    /// eagerly, so a malformed template never reaches resolution.
    pub fn parse_template(template: &str) -> Result<Self, BindError> {
        let malformed = |reason: &str| BindError::MalformedTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    let mut placeholder = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') => return Err(malformed("nested `{`")),
                            Some(c) => placeholder.push(c),
                            None => return Err(malformed("unclosed `{`")),
                        }
                    }
                    segments.push(Segment::Placeholder(classify(&placeholder).map_err(
                        |reason| malformed(&reason),
                    )?));
                }
                '}' => return Err(malformed("unmatched `}`")),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        // a lone scope reference is the direct form, native type preserved
        match segments.as_slice() {
            [Segment::Placeholder(Placeholder::Scoped { scope, path })] => {
                Ok(KeySpec::Direct { scope: *scope, path: path.clone() })
            }
            _ => Ok(KeySpec::Template(segments)),
        }
    }

    /// Reads the key description off a directive's arguments. Precedence:
    /// `id` (constant), one of `root`/`args`/`context`/`info` (direct
    /// reference, dotted paths allowed), then `key` (template).
    pub fn from_directive_args(
        directive: &str,
        args: &DirectiveArgs,
        field: &FieldMeta,
    ) -> Result<Self, BindError> {
        if let Some(id) = args.get("id") {
            return Ok(KeySpec::Constant(id.clone()));
        }

        for (name, scope) in
            [("root", Scope::Root), ("args", Scope::Args), ("context", Scope::Context), ("info", Scope::Info)]
        {
            if let Some(value) = args.get(name) {
                let Value::String(path) = value else {
                    return Err(BindError::MalformedTemplate {
                        template: value.to_string(),
                        reason: format!("`{name}` argument must be a string path"),
                    });
                };
                let path = split_path(path).map_err(|reason| BindError::MalformedTemplate {
                    template: path.clone(),
                    reason,
                })?;
                return Ok(KeySpec::Direct { scope, path });
            }
        }

        if let Some(value) = args.get("key") {
            let Value::String(template) = value else {
                return Err(BindError::MalformedTemplate {
                    template: value.to_string(),
                    reason: "`key` argument must be a template string".to_string(),
                });
            };
            return Self::parse_template(template);
        }

        Err(BindError::MissingDirectiveArgument {
            directive: directive.to_string(),
            field: field.path(),
            argument: "id, root, args, context, info or key".to_string(),
        })
    }

    /// Bind-time cardinality check: a list field needs a key that can
    /// resolve to a list, which an interpolated string template never does.
    pub fn validate_shape(&self, field: &FieldMeta) -> Result<(), BindError> {
        if !field.shape.is_list() {
            return Ok(());
        }
        match self {
            KeySpec::Constant(Value::List(_)) | KeySpec::Direct { .. } => Ok(()),
            KeySpec::Template(segments)
                if matches!(segments.as_slice(), [Segment::Placeholder(_)]) =>
            {
                Ok(())
            }
            _ => Err(BindError::ShapeMismatch { field: field.path() }),
        }
    }

    /// Evaluates the key against the runtime scopes. Stateless, called once
    /// per field resolution.
    pub fn evaluate(&self, scopes: &Scopes) -> Result<Value, ResolveError> {
        match self {
            KeySpec::Constant(value) => Ok(value.clone()),
            KeySpec::Direct { scope, path } => resolve_scoped(*scope, path, scopes),
            KeySpec::Template(segments) => {
                // a template that is exactly one placeholder keeps the
                // resolved value's native type
                if let [Segment::Placeholder(placeholder)] = segments.as_slice() {
                    return resolve_placeholder(placeholder, scopes);
                }

                let mut key = String::new();
                for segment in segments {
                    match segment {
                        Segment::Literal(text) => key.push_str(text),
                        Segment::Placeholder(placeholder) => {
                            let value = resolve_placeholder(placeholder, scopes)?;
                            key.push_str(&fragment(&value).ok_or_else(|| {
                                ResolveError::ShapeMismatch {
                                    field: scopes.info.path.clone(),
                                    reason: "cannot interpolate a list or object into a key"
                                        .to_string(),
                                }
                            })?);
                        }
                    }
                }
                Ok(Value::from(key))
            }
        }
    }
}

fn classify(placeholder: &str) -> Result<Placeholder, String> {
    if placeholder.is_empty() {
        return Err("empty placeholder".to_string());
    }

    if let Some(name) = placeholder.strip_prefix('$') {
        if !is_identifier(name) {
            return Err(format!("invalid argument name `{name}`"));
        }
        return Ok(Placeholder::Argument(name.to_string()));
    }

    if let Some((scope, rest)) = placeholder.split_once('.') {
        let scope = Scope::parse(scope).ok_or_else(|| {
            "dotted path must begin with `root.`, `args.`, `context.` or `info.`".to_string()
        })?;
        let path = split_path(rest)?;
        return Ok(Placeholder::Scoped { scope, path });
    }

    if !is_identifier(placeholder) {
        return Err(format!("invalid identifier `{placeholder}`"));
    }
    Ok(Placeholder::Bare(placeholder.to_string()))
}

fn split_path(path: &str) -> Result<Vec<String>, String> {
    let components: Vec<String> = path.split('.').map(str::to_string).collect();
    for component in &components {
        if !is_identifier(component) {
            return Err(format!("invalid path component `{component}`"));
        }
    }
    Ok(components)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn resolve_placeholder(placeholder: &Placeholder, scopes: &Scopes) -> Result<Value, ResolveError> {
    match placeholder {
        Placeholder::Argument(name) => scopes
            .args
            .get(name.as_str())
            .cloned()
            .ok_or_else(|| ResolveError::MissingArgument(name.clone())),
        Placeholder::Scoped { scope, path } => resolve_scoped(*scope, path, scopes),
        Placeholder::Bare(name) => {
            // canonical order: root first, args as the fallback
            if let Value::Object(object) = &scopes.root {
                if let Some(value) = object.get(name.as_str()) {
                    return Ok(value.clone());
                }
            }
            scopes
                .args
                .get(name.as_str())
                .cloned()
                .ok_or_else(|| ResolveError::MissingKey(name.clone()))
        }
    }
}

fn resolve_scoped(scope: Scope, path: &[String], scopes: &Scopes) -> Result<Value, ResolveError> {
    let missing = || ResolveError::MissingPath { scope, path: path.join(".") };

    let (first, rest) = path.split_first().ok_or_else(missing)?;
    let base = match scope {
        Scope::Root => {
            return walk(&scopes.root, path).cloned().ok_or_else(missing);
        }
        Scope::Args => scopes.args.get(first.as_str()).cloned(),
        Scope::Context => scopes.context.value(first).cloned(),
        Scope::Info => scopes.info.get(first),
    }
    .ok_or_else(missing)?;

    walk(&base, rest).cloned().ok_or_else(missing)
}

fn walk<'a>(mut value: &'a Value, components: &[String]) -> Option<&'a Value> {
    for component in components {
        match value {
            Value::Object(object) => value = object.get(component.as_str())?,
            _ => return None,
        }
    }
    Some(value)
}

/// String form of a scalar for key interpolation. Lists and objects have no
/// meaningful string key form.
fn fragment(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Enum(e) => Some(e.to_string()),
        Value::Null => Some("null".to_string()),
        _ => None,
    }
}
