// src/annotation.rs
//! Annotation model.
//!
//! An [`Annotation`] is a fully resolved type expression plus the raw hint
//! it came from (used only for naming unions) and the declaration site
//! (used only for diagnostics). Optionality is always the dedicated
//! [`AnnotationKind::Optional`] node; the schema builder never sees a union
//! with an absent member.
pub mod resolve;
pub mod unwrap;

use crate::native::{ClassRef, Hint, TypeExpr, TypeKey};

pub use resolve::{
    callable_annotations, class_annotations, make_annotation, property_annotation, ArgAnnotation,
    CallableAnnotations,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AnnotationOrigin {
    pub classname: String,
    pub fieldname: String,
}

impl AnnotationOrigin {
    pub fn new(classname: impl Into<String>, fieldname: impl Into<String>) -> Self {
        AnnotationOrigin { classname: classname.into(), fieldname: fieldname.into() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub raw: Option<Hint>,
    pub resolved: TypeExpr,
    pub origin: Option<AnnotationOrigin>,
    pub kind: AnnotationKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AnnotationKind {
    Class(ClassRef),
    List(Box<Annotation>),
    Optional(Box<Annotation>),
    Union(Vec<Annotation>),
    /// Alias wrapping its ultimate, non-alias base.
    Alias(Box<Annotation>),
}

impl Annotation {
    /// A bare class reference with no raw text or origin.
    pub fn of_class(class: &ClassRef) -> Self {
        Annotation {
            raw: None,
            resolved: TypeExpr::Class(class.clone()),
            origin: None,
            kind: AnnotationKind::Class(class.clone()),
        }
    }

    /// Memo-table identity.
    pub fn key(&self) -> TypeKey {
        self.resolved.key()
    }

    /// The raw hint, when it is text.
    pub fn name(&self) -> Option<&str> {
        self.raw.as_ref().and_then(Hint::as_text).map(str::trim)
    }
}
