//! typegraph: translate declared native types into a GraphQL schema.
//!
//! Classes are declared through [`native::ClassDef::build`], hints are
//! evaluated against a [`native::Namespace`], and a [`SchemaBuilder`]
//! walks the annotation graph from the root query type down to a closed
//! [`Schema`]. The [`engine`] module hands the result to `async-graphql`.

pub mod annotation;
pub mod builder;
pub mod engine;
pub mod error;
pub mod fields;
pub mod native;
pub mod resolver;
pub mod scalar;
pub mod schema;

pub use annotation::{Annotation, AnnotationKind, AnnotationOrigin};
pub use builder::{make_schema, SchemaBuilder};
pub use engine::root_request;
pub use error::SchemaError;
pub use native::{
    Args, ClassDef, ClassRef, AliasRef, Hint, Method, Namespace, Param, Property, TypeExpr, Value,
};
pub use resolver::{ResolveInfo, Resolver};
pub use scalar::ScalarDescriptor;
pub use schema::{NamedType, Schema, TypeNode};
