// src/annotation/resolve.rs
//! Resolve evaluated type expressions into [`Annotation`] trees, and
//! collect the hints of classes, properties and methods.

use indexmap::IndexMap;

use super::unwrap::{union_member_raws, unwrap_outer_nullable};
use super::{Annotation, AnnotationKind, AnnotationOrigin};
use crate::error::{Location, Result, SchemaError};
use crate::native::{ClassRef, Hint, Method, Namespace, Property, TypeExpr, Value};

/// Build an annotation from an evaluated expression. `raw` is the hint as
/// written and only feeds union naming; `origin` only feeds diagnostics.
pub fn make_annotation(
    raw: Option<&Hint>,
    parsed: &TypeExpr,
    origin: Option<&AnnotationOrigin>,
) -> Result<Annotation> {
    let annotation = |kind| Annotation {
        raw: raw.cloned(),
        resolved: parsed.clone(),
        origin: origin.cloned(),
        kind,
    };

    match parsed {
        TypeExpr::Union(members) => {
            let is_optional = members.iter().any(|m| matches!(m, TypeExpr::NoneType));
            let args: Vec<&TypeExpr> =
                members.iter().filter(|m| !matches!(m, TypeExpr::NoneType)).collect();

            let inner = match args.as_slice() {
                [] => {
                    return Err(SchemaError::malformed(parsed.to_string(), "union without members")
                        .at(origin));
                }
                [only] => make_annotation(unwrap_outer_nullable(raw).as_ref(), only, origin)?,
                _ => {
                    // Member raws only line up when the counts agree.
                    let raws: Vec<Option<Hint>> = union_member_raws(raw)
                        .filter(|raws| raws.len() == args.len())
                        .map(|raws| raws.into_iter().map(Some).collect())
                        .unwrap_or_else(|| vec![None; args.len()]);
                    let of_types = args
                        .iter()
                        .zip(raws)
                        .map(|(arg, member_raw)| make_annotation(member_raw.as_ref(), arg, origin))
                        .collect::<Result<Vec<_>>>()?;
                    let union_raw = if is_optional { unwrap_outer_nullable(raw) } else { raw.cloned() };
                    Annotation {
                        raw: union_raw,
                        resolved: TypeExpr::Union(args.iter().map(|a| (*a).clone()).collect()),
                        origin: origin.cloned(),
                        kind: AnnotationKind::Union(of_types),
                    }
                }
            };

            Ok(if is_optional {
                annotation(AnnotationKind::Optional(Box::new(inner)))
            } else {
                inner
            })
        }
        TypeExpr::Alias(alias) => {
            let base = make_annotation(None, &alias.ultimate(), origin)?;
            Ok(annotation(AnnotationKind::Alias(Box::new(base))))
        }
        TypeExpr::Generic { origin: kind, args } if kind.is_sequence() => match args.as_slice() {
            [element] => {
                let element = make_annotation(unwrap_outer_nullable(raw).as_ref(), element, origin)?;
                Ok(annotation(AnnotationKind::List(Box::new(element))))
            }
            [] => Err(SchemaError::malformed(parsed.to_string(), "sequence without element type")
                .at(origin)),
            _ => Err(SchemaError::AmbiguousSequence {
                expr: parsed.to_string(),
                location: Location::from(origin),
            }),
        },
        TypeExpr::Generic { .. } => {
            Err(SchemaError::malformed(parsed.to_string(), "unsupported generic type").at(origin))
        }
        TypeExpr::Class(class) => Ok(annotation(AnnotationKind::Class(class.clone()))),
        TypeExpr::NoneType => Ok(annotation(AnnotationKind::Class(ClassRef::none_type()))),
        TypeExpr::Forward(text) => {
            Err(SchemaError::malformed(format!("'{text}'"), "unresolved forward reference").at(origin))
        }
    }
}

fn resolve_hint(hint: &Hint, ns: &Namespace, origin: AnnotationOrigin) -> Result<Annotation> {
    let parsed = ns.eval(hint).map_err(|e| e.at(Some(&origin)))?;
    make_annotation(Some(hint), &parsed, Some(&origin))
}

// ---- Hint collection ---- //

/// Explicit annotations of a class and its bases, base declarations first.
pub fn class_annotations(class: &ClassRef, ns: &Namespace) -> Result<IndexMap<String, Annotation>> {
    class
        .all_hints()
        .into_iter()
        .map(|(name, (declared_on, hint))| {
            let origin = AnnotationOrigin::new(declared_on.name(), &name);
            Ok((name, resolve_hint(&hint, ns, origin)?))
        })
        .collect()
}

pub fn property_annotation(class: &ClassRef, property: &Property, ns: &Namespace) -> Result<Annotation> {
    let origin = AnnotationOrigin::new(format!("{}.{}", class.name(), property.name()), "return");
    resolve_hint(property.returns(), ns, origin)
}

#[derive(Clone, Debug)]
pub struct ArgAnnotation {
    pub name: String,
    pub annotation: Annotation,
    pub default: Option<Value>,
}

#[derive(Clone, Debug)]
pub struct CallableAnnotations {
    pub args: Vec<ArgAnnotation>,
    pub returns: Annotation,
}

/// Parameter and return annotations of a method. A parameter defaulting
/// to `None` is widened to `Optional[...]`.
pub fn callable_annotations(
    class: &ClassRef,
    method: &Method,
    ns: &Namespace,
) -> Result<CallableAnnotations> {
    let site = format!("{}.{}", class.name(), method.name());
    let mut args = Vec::with_capacity(method.params().len());
    for param in method.params() {
        let origin = AnnotationOrigin::new(&site, &param.name);
        let mut parsed = ns.eval(&param.hint).map_err(|e| e.at(Some(&origin)))?;
        if matches!(param.default, Some(Value::Null)) {
            parsed = TypeExpr::optional(parsed);
        }
        args.push(ArgAnnotation {
            name: param.name.clone(),
            annotation: make_annotation(Some(&param.hint), &parsed, Some(&origin))?,
            default: param.default.clone(),
        });
    }
    let returns = resolve_hint(method.returns(), ns, AnnotationOrigin::new(&site, "return"))?;
    Ok(CallableAnnotations { args, returns })
}
