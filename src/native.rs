// src/native.rs
//! Host object model.
//!
//! Rust has no live reflection, so classes are declared explicitly: a
//! [`ClassDef`] carries capability flags, members with their hints, record
//! fields and enum variants, and registers itself with its bases so that
//! interface implementers can be discovered later.
pub mod class;
pub mod expr;
pub mod namespace;
pub mod value;

pub use class::{Args, ClassBuilder, ClassDef, ClassId, ClassRef, Member, Method, Param, Primitive, Property};
pub use expr::{AliasDef, AliasRef, GenericKind, Hint, TypeExpr, TypeKey};
pub use namespace::Namespace;
pub use value::{EnumMember, Instance, Value};
