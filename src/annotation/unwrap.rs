// src/annotation/unwrap.rs
//! Best-effort raw-text unwrapping: `"Optional[Foo]"` → `"Foo"`.
//!
//! Nothing here aborts resolution; failure just means no raw text for the
//! inner type.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::native::{Hint, TypeExpr};

static OUTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*[_a-zA-Z][_a-zA-Z0-9.]*\s*\[(.+)\]\s*$").expect("static pattern")
});

#[derive(Debug, Error, PartialEq)]
pub enum UnwrapError {
    #[error("`{0}` does not look like `Name[...]`")]
    Pattern(String),
    #[error("cannot unwrap a union with several non-null members: {0}")]
    Union(String),
    #[error("expected a single type argument, got {0} in `{1}`")]
    Arity(usize, String),
}

pub fn unwrap_outer_str(raw: &str) -> Result<String, UnwrapError> {
    OUTER
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|inner| unquote(inner.as_str()).to_string())
        .ok_or_else(|| UnwrapError::Pattern(raw.to_string()))
}

/// Strip one wrapper layer off a raw hint.
pub fn unwrap_outer(raw: &Hint) -> Result<Hint, UnwrapError> {
    match raw {
        Hint::Text(text) => unwrap_outer_str(text).map(Hint::Text),
        Hint::Expr(expr @ TypeExpr::Union(members)) => {
            let mut rest = members.iter().filter(|m| !matches!(m, TypeExpr::NoneType));
            match (rest.next(), rest.next()) {
                (Some(only), None) => Ok(hint_of(only)),
                _ => Err(UnwrapError::Union(expr.to_string())),
            }
        }
        Hint::Expr(expr) => match expr.args() {
            [only] => Ok(hint_of(only)),
            args => Err(UnwrapError::Arity(args.len(), expr.to_string())),
        },
    }
}

pub fn unwrap_outer_nullable(raw: Option<&Hint>) -> Option<Hint> {
    unwrap_outer(raw?).ok()
}

/// Per-member raw hints of a union hint, with `None` members dropped.
/// `"Union[Foo, Bar]"` and `"Optional[Union[Foo, Bar]]"` both give
/// `["Foo", "Bar"]`; a bare name gives nothing.
pub fn union_member_raws(raw: Option<&Hint>) -> Option<Vec<Hint>> {
    match raw? {
        Hint::Text(text) => {
            let inner = unwrap_outer_str(text).ok()?;
            let parts = split_top_level(&inner);
            if parts.len() > 1 {
                Some(
                    parts
                        .into_iter()
                        .filter(|p| *p != "None")
                        .map(|p| Hint::Text(unquote(p).to_string()))
                        .collect(),
                )
            } else {
                union_member_raws(Some(&Hint::Text(inner)))
            }
        }
        Hint::Expr(TypeExpr::Union(members)) => Some(
            members
                .iter()
                .filter(|m| !matches!(m, TypeExpr::NoneType))
                .map(hint_of)
                .collect(),
        ),
        Hint::Expr(_) => None,
    }
}

/// Trim, then drop one layer of matching quotes: `'Pet'` → `Pet`.
pub(crate) fn unquote(text: &str) -> &str {
    let text = text.trim();
    for q in ['\'', '"'] {
        if let Some(inner) = text.strip_prefix(q).and_then(|t| t.strip_suffix(q)) {
            return inner.trim();
        }
    }
    text
}

fn hint_of(expr: &TypeExpr) -> Hint {
    match expr {
        TypeExpr::Forward(text) => Hint::Text(text.clone()),
        other => Hint::Expr(other.clone()),
    }
}

/// Split on commas that sit outside brackets and quotes.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::ClassRef;

    #[test]
    fn unwraps_one_layer_of_text() {
        assert_eq!(unwrap_outer_str("Optional[int]").unwrap(), "int");
        assert_eq!(unwrap_outer_str("  Optional[ List[int] ]  ").unwrap(), "List[int]");
        assert_eq!(unwrap_outer_str("List[Optional[int]]").unwrap(), "Optional[int]");
        assert_eq!(unwrap_outer_str("Dict[str, int]").unwrap(), "str, int");
    }

    #[test]
    fn quoted_forward_references_lose_their_quotes() {
        assert_eq!(unwrap_outer_str("Optional['Pet']").unwrap(), "Pet");
        assert_eq!(unwrap_outer_str("List[\"Pet\"]").unwrap(), "Pet");
        assert_eq!(unwrap_outer_str("List['Pet']").unwrap(), "Pet");
        assert_eq!(unwrap_outer_str("Optional[List['Pet']]").unwrap(), "List['Pet']");
        let raws = union_member_raws(Some(&Hint::from("Union['Cat', Dog]"))).unwrap();
        assert_eq!(raws, [Hint::from("Cat"), Hint::from("Dog")]);
        assert_eq!(unquote("'Pet"), "'Pet");
    }

    #[test]
    fn text_without_brackets_does_not_unwrap() {
        assert!(unwrap_outer_str("int").is_err());
        assert!(unwrap_outer_str("[int]").is_err());
        assert!(unwrap_outer_str("Optional[]").is_err());
    }

    #[test]
    fn unwraps_expressions() {
        let int = TypeExpr::from(ClassRef::int());
        assert_eq!(
            unwrap_outer(&Hint::Expr(TypeExpr::optional(int.clone()))).unwrap(),
            Hint::Expr(int.clone())
        );
        assert_eq!(
            unwrap_outer(&Hint::Expr(TypeExpr::list(TypeExpr::forward("int")))).unwrap(),
            Hint::Text("int".into())
        );
        let nested = TypeExpr::list(TypeExpr::optional(TypeExpr::forward("int")));
        assert_eq!(
            unwrap_outer(&Hint::Expr(nested)).unwrap(),
            Hint::Expr(TypeExpr::optional(TypeExpr::forward("int")))
        );
    }

    #[test]
    fn ambiguous_expressions_do_not_unwrap() {
        let either = TypeExpr::union([ClassRef::int().into(), ClassRef::str().into()]);
        assert!(matches!(unwrap_outer(&Hint::Expr(either)), Err(UnwrapError::Union(_))));
        assert!(matches!(
            unwrap_outer(&Hint::Expr(ClassRef::int().into())),
            Err(UnwrapError::Arity(0, _))
        ));
        assert_eq!(unwrap_outer_nullable(None), None);
    }

    #[test]
    fn splits_union_members() {
        let raws = union_member_raws(Some(&"Optional[Union[Foo, List[Bar]]]".into())).unwrap();
        assert_eq!(raws, vec![Hint::from("Foo"), Hint::from("List[Bar]")]);

        let raws = union_member_raws(Some(&"Union[Foo, Bar, None]".into())).unwrap();
        assert_eq!(raws, vec![Hint::from("Foo"), Hint::from("Bar")]);

        assert_eq!(union_member_raws(Some(&"Optional[FooOrBar]".into())), None);
    }
}
