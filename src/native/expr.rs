// src/native/expr.rs
//! Type expressions: the small `typing`-like grammar hints evaluate to.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;

use super::class::{ClassId, ClassRef};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GenericKind {
    List,
    Iterable,
    Iterator,
    /// Any other subscripted generic (`Dict`, `Tuple`, ...).
    Other(String),
}

impl GenericKind {
    pub fn is_sequence(&self) -> bool {
        matches!(self, GenericKind::List | GenericKind::Iterable | GenericKind::Iterator)
    }

    fn name(&self) -> &str {
        match self {
            GenericKind::List => "List",
            GenericKind::Iterable => "Iterable",
            GenericKind::Iterator => "Iterator",
            GenericKind::Other(name) => name,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeExpr {
    Class(ClassRef),
    NoneType,
    Union(Vec<TypeExpr>),
    Alias(AliasRef),
    Generic { origin: GenericKind, args: Vec<TypeExpr> },
    /// Unevaluated forward reference.
    Forward(String),
}

impl TypeExpr {
    /// Flattens nested unions, drops duplicates and collapses a single
    /// member, like `typing.Union` does.
    pub fn union(members: impl IntoIterator<Item = TypeExpr>) -> TypeExpr {
        let mut flat: Vec<TypeExpr> = Vec::new();
        let mut seen: Vec<TypeKey> = Vec::new();
        let mut push = |member: TypeExpr, flat: &mut Vec<TypeExpr>| {
            let key = member.key();
            if !seen.contains(&key) {
                seen.push(key);
                flat.push(member);
            }
        };
        for member in members {
            match member {
                TypeExpr::Union(inner) => inner.into_iter().for_each(|m| push(m, &mut flat)),
                other => push(other, &mut flat),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            TypeExpr::Union(flat)
        }
    }

    pub fn optional(inner: TypeExpr) -> TypeExpr {
        TypeExpr::union([inner, TypeExpr::NoneType])
    }

    pub fn list(element: TypeExpr) -> TypeExpr {
        TypeExpr::Generic { origin: GenericKind::List, args: vec![element] }
    }

    pub fn forward(text: impl Into<String>) -> TypeExpr {
        TypeExpr::Forward(text.into())
    }

    /// Type arguments of a union or generic.
    pub fn args(&self) -> &[TypeExpr] {
        match self {
            TypeExpr::Union(members) => members,
            TypeExpr::Generic { args, .. } => args,
            _ => &[],
        }
    }

    /// Hashable identity: classes and aliases by id, unions regardless of
    /// member order.
    pub fn key(&self) -> TypeKey {
        match self {
            TypeExpr::Class(class) => TypeKey::Class(class.id()),
            TypeExpr::NoneType => TypeKey::NoneType,
            TypeExpr::Alias(alias) => TypeKey::Alias(alias.id),
            TypeExpr::Union(members) => {
                let mut keys: Vec<TypeKey> = members.iter().map(TypeExpr::key).collect();
                keys.sort();
                keys.dedup();
                TypeKey::Union(keys)
            }
            TypeExpr::Generic { origin, args } => {
                TypeKey::Generic(origin.clone(), args.iter().map(TypeExpr::key).collect())
            }
            TypeExpr::Forward(text) => TypeKey::Forward(text.clone()),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[TypeExpr]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }
        match self {
            TypeExpr::Class(class) => f.write_str(class.name()),
            TypeExpr::NoneType => f.write_str("None"),
            TypeExpr::Alias(alias) => f.write_str(&alias.name),
            TypeExpr::Union(members) => {
                let (none, rest): (Vec<_>, Vec<_>) =
                    members.iter().cloned().partition(|m| matches!(m, TypeExpr::NoneType));
                if !none.is_empty() && rest.len() == 1 {
                    write!(f, "Optional[{}]", rest[0])
                } else {
                    f.write_str("Union[")?;
                    join(f, members)?;
                    f.write_str("]")
                }
            }
            TypeExpr::Generic { origin, args } => {
                write!(f, "{}[", origin.name())?;
                join(f, args)?;
                f.write_str("]")
            }
            TypeExpr::Forward(text) => write!(f, "'{text}'"),
        }
    }
}

impl From<ClassRef> for TypeExpr {
    fn from(class: ClassRef) -> Self {
        TypeExpr::Class(class)
    }
}

impl From<&ClassRef> for TypeExpr {
    fn from(class: &ClassRef) -> Self {
        TypeExpr::Class(class.clone())
    }
}

impl From<&AliasRef> for TypeExpr {
    fn from(alias: &AliasRef) -> Self {
        TypeExpr::Alias(alias.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeKey {
    Class(ClassId),
    NoneType,
    Alias(u64),
    Union(Vec<TypeKey>),
    Generic(GenericKind, Vec<TypeKey>),
    Forward(String),
}

// ---- Aliases ---- //

static NEXT_ALIAS_ID: AtomicU64 = AtomicU64::new(1);

static ID: Lazy<AliasRef> = Lazy::new(|| AliasRef::new("ID", ClassRef::str()));

/// A distinctly named alias of another type (`NewType`).
#[derive(Debug)]
pub struct AliasDef {
    id: u64,
    pub name: String,
    pub supertype: TypeExpr,
}

#[derive(Clone, Debug)]
pub struct AliasRef(Arc<AliasDef>);

impl AliasRef {
    pub fn new(name: impl Into<String>, supertype: impl Into<TypeExpr>) -> Self {
        AliasRef(Arc::new(AliasDef {
            id: NEXT_ALIAS_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            supertype: supertype.into(),
        }))
    }

    /// The built-in `ID` alias over `str`.
    pub fn id() -> AliasRef {
        ID.clone()
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The first non-alias type down the supertype chain.
    pub fn ultimate(&self) -> TypeExpr {
        let mut current = &self.0.supertype;
        while let TypeExpr::Alias(next) = current {
            current = &next.0.supertype;
        }
        current.clone()
    }
}

impl std::ops::Deref for AliasRef {
    type Target = AliasDef;

    fn deref(&self) -> &AliasDef {
        &self.0
    }
}

impl PartialEq for AliasRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

// ---- Hints ---- //

/// The raw form of an annotation: source text, or an expression that may
/// still hold forward references.
#[derive(Clone, Debug, PartialEq)]
pub enum Hint {
    Text(String),
    Expr(TypeExpr),
}

impl Hint {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Hint::Text(text) => Some(text),
            Hint::Expr(_) => None,
        }
    }
}

impl fmt::Display for Hint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hint::Text(text) => f.write_str(text),
            Hint::Expr(expr) => write!(f, "{expr}"),
        }
    }
}

impl From<&str> for Hint {
    fn from(text: &str) -> Self {
        Hint::Text(text.to_string())
    }
}

impl From<String> for Hint {
    fn from(text: String) -> Self {
        Hint::Text(text)
    }
}

impl From<TypeExpr> for Hint {
    fn from(expr: TypeExpr) -> Self {
        Hint::Expr(expr)
    }
}

impl From<&ClassRef> for Hint {
    fn from(class: &ClassRef) -> Self {
        Hint::Expr(TypeExpr::from(class))
    }
}

impl From<&AliasRef> for Hint {
    fn from(alias: &AliasRef) -> Self {
        Hint::Expr(TypeExpr::from(alias))
    }
}
