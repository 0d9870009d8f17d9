// src/native/namespace.rs
//! Module scope for evaluating hints.
//!
//! Grammar of textual hints:
//!
//! ```text
//! expr := NAME ( '[' expr ( ',' expr )* ']' )?
//!       | '\'' text '\''
//!       | '"' text '"'
//! ```
//!
//! Names may be dotted (`typing.Optional`); only the last segment is looked
//! up among the built-ins. Quoted text is a forward reference and is
//! evaluated in turn.

use indexmap::IndexMap;
use tracing::trace;

use super::class::ClassRef;
use super::expr::{AliasRef, GenericKind, Hint, TypeExpr};
use crate::error::{Location, Result, SchemaError};

/// Alias bindings deeper than this are treated as self-recursive.
const MAX_DEPTH: usize = 32;

#[derive(Clone, Debug, Default)]
pub struct Namespace {
    bindings: IndexMap<String, Hint>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a name to a hint, e.g. a union alias:
    /// `ns.bind("Person", "Union[Manager, Employee]")`.
    pub fn bind(&mut self, name: impl Into<String>, hint: impl Into<Hint>) -> &mut Self {
        self.bindings.insert(name.into(), hint.into());
        self
    }

    pub fn add_class(&mut self, class: &ClassRef) -> &mut Self {
        self.bind(class.name().to_string(), class)
    }

    pub fn add_alias(&mut self, alias: &AliasRef) -> &mut Self {
        self.bind(alias.name().to_string(), alias)
    }

    pub fn with_classes<'a>(classes: impl IntoIterator<Item = &'a ClassRef>) -> Self {
        let mut ns = Namespace::new();
        for class in classes {
            ns.add_class(class);
        }
        ns
    }

    pub fn get(&self, name: &str) -> Option<&Hint> {
        self.bindings.get(name)
    }

    /// Evaluate a hint into a type expression with every forward reference
    /// resolved.
    pub fn eval(&self, hint: &Hint) -> Result<TypeExpr> {
        self.eval_hint(hint, 0)
    }

    fn eval_hint(&self, hint: &Hint, depth: usize) -> Result<TypeExpr> {
        if depth > MAX_DEPTH {
            return Err(SchemaError::malformed(hint.to_string(), "recursive alias"));
        }
        match hint {
            Hint::Text(text) => self.eval_text(text, depth),
            Hint::Expr(expr) => self.eval_expr(expr, depth),
        }
    }

    fn eval_text(&self, text: &str, depth: usize) -> Result<TypeExpr> {
        let syntax = Parser::new(text).parse()?;
        self.eval_syntax(&syntax, depth)
    }

    fn eval_expr(&self, expr: &TypeExpr, depth: usize) -> Result<TypeExpr> {
        Ok(match expr {
            TypeExpr::Forward(text) => self.eval_text(text, depth + 1)?,
            TypeExpr::Union(members) => TypeExpr::union(
                members.iter().map(|m| self.eval_expr(m, depth)).collect::<Result<Vec<_>>>()?,
            ),
            TypeExpr::Generic { origin, args } => TypeExpr::Generic {
                origin: origin.clone(),
                args: args.iter().map(|a| self.eval_expr(a, depth)).collect::<Result<_>>()?,
            },
            TypeExpr::Class(_) | TypeExpr::NoneType | TypeExpr::Alias(_) => expr.clone(),
        })
    }

    fn eval_syntax(&self, syntax: &Syntax, depth: usize) -> Result<TypeExpr> {
        match syntax {
            Syntax::Quoted(text) => self.eval_text(text, depth + 1),
            Syntax::Name(name) => {
                if let Some(bound) = self.bindings.get(name.as_str()) {
                    trace!(%name, "namespace binding");
                    return self.eval_hint(bound, depth + 1);
                }
                match last_segment(name) {
                    "int" => Ok(ClassRef::int().into()),
                    "float" => Ok(ClassRef::float().into()),
                    "str" => Ok(ClassRef::str().into()),
                    "bool" => Ok(ClassRef::bool().into()),
                    "None" | "NoneType" => Ok(TypeExpr::NoneType),
                    "ID" => Ok(TypeExpr::Alias(AliasRef::id())),
                    "list" => Ok(ClassRef::list().into()),
                    head if generic_head(head).is_some() => Err(SchemaError::malformed(
                        name.clone(),
                        format!("`{head}` needs a type argument"),
                    )),
                    _ => Err(SchemaError::UnknownName {
                        name: name.clone(),
                        location: Location::default(),
                    }),
                }
            }
            Syntax::Subscript(head, args) => {
                let args = args
                    .iter()
                    .map(|a| self.eval_syntax(a, depth))
                    .collect::<Result<Vec<_>>>()?;
                match generic_head(last_segment(head)) {
                    Some(Head::Optional) => match <[TypeExpr; 1]>::try_from(args) {
                        Ok([inner]) => Ok(TypeExpr::optional(inner)),
                        Err(args) => Err(SchemaError::malformed(
                            syntax.to_string(),
                            format!("Optional takes one type argument, got {}", args.len()),
                        )),
                    },
                    Some(Head::Union) => Ok(TypeExpr::union(args)),
                    Some(Head::Generic(origin)) => Ok(TypeExpr::Generic { origin, args }),
                    None => Err(SchemaError::malformed(
                        syntax.to_string(),
                        format!("`{head}` is not a generic type"),
                    )),
                }
            }
        }
    }
}

fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

enum Head {
    Optional,
    Union,
    Generic(GenericKind),
}

fn generic_head(name: &str) -> Option<Head> {
    Some(match name {
        "Optional" => Head::Optional,
        "Union" => Head::Union,
        "List" | "list" | "Sequence" => Head::Generic(GenericKind::List),
        "Iterable" => Head::Generic(GenericKind::Iterable),
        "Iterator" => Head::Generic(GenericKind::Iterator),
        "Dict" | "dict" | "Set" | "set" | "FrozenSet" | "Tuple" | "tuple" => {
            Head::Generic(GenericKind::Other(name.to_string()))
        }
        _ => return None,
    })
}

// ---- Parser ---- //

#[derive(Clone, Debug, PartialEq)]
enum Syntax {
    Name(String),
    Quoted(String),
    Subscript(String, Vec<Syntax>),
}

impl std::fmt::Display for Syntax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Syntax::Name(name) => f.write_str(name),
            Syntax::Quoted(text) => write!(f, "'{text}'"),
            Syntax::Subscript(head, args) => {
                write!(f, "{head}[")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str("]")
            }
        }
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Parser { src, pos: 0 }
    }

    fn parse(mut self) -> Result<Syntax> {
        let syntax = self.expr()?;
        self.skip_ws();
        if self.pos < self.src.len() {
            return Err(self.error(format!("unexpected `{}`", &self.src[self.pos..])));
        }
        Ok(syntax)
    }

    fn error(&self, reason: impl Into<String>) -> SchemaError {
        SchemaError::malformed(self.src, reason)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, want: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(want) {
            self.pos += want.len_utf8();
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Result<Syntax> {
        self.skip_ws();
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                let start = self.pos;
                let len = self.src[start..]
                    .find(quote)
                    .ok_or_else(|| self.error("unterminated string"))?;
                self.pos = start + len + 1;
                Ok(Syntax::Quoted(self.src[start..start + len].trim().to_string()))
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let name = self.name();
                if !self.eat('[') {
                    return Ok(Syntax::Name(name));
                }
                let mut args = vec![self.expr()?];
                while self.eat(',') {
                    args.push(self.expr()?);
                }
                if !self.eat(']') {
                    return Err(self.error("expected `]`"));
                }
                Ok(Syntax::Subscript(name, args))
            }
            Some(c) => Err(self.error(format!("unexpected `{c}`"))),
            None => Err(self.error("unexpected end of hint")),
        }
    }

    fn name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_' || c == '.') {
                break;
            }
            self.pos += 1;
        }
        self.src[start..self.pos].to_string()
    }
}
