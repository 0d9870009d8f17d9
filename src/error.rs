// src/error.rs
//! Schema-construction failures. Every variant is fatal to the build that
//! raised it; no partial schema is ever returned.

use std::fmt;

use thiserror::Error;

use crate::annotation::AnnotationOrigin;

/// Where an annotation was declared, rendered as a trailing sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location(pub Option<AnnotationOrigin>);

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(origin) => write!(f, "\nDefined at {}.{}.", origin.classname, origin.fieldname),
            None => Ok(()),
        }
    }
}

impl From<Option<&AnnotationOrigin>> for Location {
    fn from(origin: Option<&AnnotationOrigin>) -> Self {
        Location(origin.cloned())
    }
}

#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    #[error(
        "Cannot translate `{type_repr}`.{location}\n\
         Suggestions:\n\
         - Did you forget to inherit Object?\n\
         - Did you forget to add its scalar mapper to the `scalars` list?"
    )]
    Untranslatable { type_repr: String, location: Location },

    #[error(
        "Could not find a name for Union[{members}].{location}\n\
         In GraphQL, any union needs a name, so all unions must be referenced \
         through a named alias instead of being written inline. For example:\n\
         \x20   namespace.bind(\"Person\", \"Union[Manager, Employee]\");\n\
         and then annotate the field as \"Optional[Person]\" (or \"Person\")."
    )]
    UnnamedUnion { members: String, location: Location },

    #[error(
        "No type hint found for {class}.{field}.\n\
         Suggestion: annotate the field, e.g. `.annotate(\"{field}\", \"str\")`."
    )]
    MissingFieldHint { class: String, field: String },

    #[error(
        "Sequence type `{expr}` has more than one type argument; its element type is ambiguous.{location}"
    )]
    AmbiguousSequence { expr: String, location: Location },

    #[error("Don't understand type `{expr}`: {reason}{location}")]
    Malformed { expr: String, reason: String, location: Location },

    #[error("Name `{name}` is not bound in the namespace.{location}")]
    UnknownName { name: String, location: Location },

    #[error("Union `{union}` may only contain object types, but `{member}` is not one.")]
    InvalidUnionMember { union: String, member: String },

    #[error("The {role} root must map to an object type, got `{type_name}`.")]
    InvalidRoot { role: &'static str, type_name: String },

    #[error("Schema must contain unique named types but contains multiple types named `{name}`.")]
    ConflictingTypeName { name: String },

    #[error("execution engine rejected the schema: {0}")]
    Engine(String),
}

impl SchemaError {
    /// Attach a declaration site to errors that carry one, unless a more
    /// specific site was already recorded.
    pub fn at(mut self, origin: Option<&AnnotationOrigin>) -> Self {
        let Some(origin) = origin else { return self };
        match &mut self {
            SchemaError::Untranslatable { location, .. }
            | SchemaError::UnnamedUnion { location, .. }
            | SchemaError::AmbiguousSequence { location, .. }
            | SchemaError::Malformed { location, .. }
            | SchemaError::UnknownName { location, .. } => {
                if location.0.is_none() {
                    location.0 = Some(origin.clone());
                }
            }
            _ => {}
        }
        self
    }

    pub fn malformed(expr: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::Malformed {
            expr: expr.into(),
            reason: reason.into(),
            location: Location::default(),
        }
    }
}

pub type Result<T, E = SchemaError> = std::result::Result<T, E>;
