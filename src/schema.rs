// src/schema.rs
//! Schema type nodes and the finished [`Schema`].
//!
//! Object, interface, input and union nodes are created with empty
//! `OnceCell`s and realized later by the builder, so types may refer to
//! each other (or themselves) freely. The resulting graph is cyclic through
//! `Arc`s; a schema is meant to be built once and kept.

use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, bail};
use async_graphql::Value as Literal;
use indexmap::IndexMap;
use once_cell::sync::{Lazy, OnceCell};

use crate::annotation::Annotation;
use crate::error::{Result, SchemaError};
use crate::fields::FieldSource;
use crate::native::{Args, ClassRef, Value};
use crate::resolver::Resolver;
use crate::scalar::ScalarHooks;

static NO_FIELDS: Lazy<IndexMap<String, FieldDef>> = Lazy::new(IndexMap::new);
static NO_INPUT_FIELDS: Lazy<IndexMap<String, InputFieldDef>> = Lazy::new(IndexMap::new);

// ————— TYPE REFERENCES ————

#[derive(Clone)]
pub enum TypeNode {
    Named(Arc<NamedType>),
    List(Box<TypeNode>),
    NonNull(Box<TypeNode>),
}

impl TypeNode {
    pub fn non_null(inner: TypeNode) -> TypeNode {
        TypeNode::NonNull(Box::new(inner))
    }

    pub fn list(inner: TypeNode) -> TypeNode {
        TypeNode::List(Box::new(inner))
    }

    /// Strip exactly one non-null layer, if present.
    pub fn unwrap_non_null(self) -> TypeNode {
        match self {
            TypeNode::NonNull(inner) => *inner,
            other => other,
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeNode::NonNull(_))
    }

    /// The named type under all wrappers.
    pub fn named_type(&self) -> &Arc<NamedType> {
        match self {
            TypeNode::Named(named) => named,
            TypeNode::List(inner) | TypeNode::NonNull(inner) => inner.named_type(),
        }
    }

    /// Same shape, and the same node (by reference) underneath.
    pub fn same_as(&self, other: &TypeNode) -> bool {
        match (self, other) {
            (TypeNode::Named(a), TypeNode::Named(b)) => Arc::ptr_eq(a, b),
            (TypeNode::List(a), TypeNode::List(b)) | (TypeNode::NonNull(a), TypeNode::NonNull(b)) => {
                a.same_as(b)
            }
            _ => false,
        }
    }
}

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeNode::Named(named) => f.write_str(named.name()),
            TypeNode::List(inner) => write!(f, "[{inner}]"),
            TypeNode::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

impl fmt::Debug for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeNode({self})")
    }
}

// ————— NAMED TYPES ————

pub enum NamedType {
    Object(ObjectType),
    Interface(InterfaceType),
    Input(InputType),
    Enum(EnumType),
    Scalar(ScalarType),
    Union(UnionType),
}

pub struct ObjectType {
    pub name: String,
    pub description: Option<String>,
    pub class: ClassRef,
    pub(crate) fields: OnceCell<IndexMap<String, FieldDef>>,
    pub(crate) interfaces: OnceCell<Vec<Arc<NamedType>>>,
}

pub struct InterfaceType {
    pub name: String,
    pub description: Option<String>,
    pub class: ClassRef,
    pub(crate) fields: OnceCell<IndexMap<String, FieldDef>>,
}

pub struct InputType {
    pub name: String,
    pub description: Option<String>,
    pub class: ClassRef,
    pub(crate) fields: OnceCell<IndexMap<String, InputFieldDef>>,
}

pub struct EnumType {
    pub name: String,
    pub description: Option<String>,
    pub class: ClassRef,
    pub values: IndexMap<String, Value>,
}

pub struct ScalarType {
    pub name: String,
    pub description: Option<String>,
    pub hooks: ScalarHooks,
}

pub struct UnionType {
    pub name: String,
    pub description: Option<String>,
    pub(crate) member_annotations: Vec<Annotation>,
    pub(crate) members: OnceCell<Vec<Arc<NamedType>>>,
}

#[derive(Clone)]
pub struct FieldDef {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeNode,
    pub args: IndexMap<String, ArgumentDef>,
    pub source: FieldSource,
    pub resolver: Resolver,
}

#[derive(Clone, Debug)]
pub struct ArgumentDef {
    pub name: String,
    pub ty: TypeNode,
    pub default: Option<Value>,
}

#[derive(Clone, Debug)]
pub struct InputFieldDef {
    pub name: String,
    pub ty: TypeNode,
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("args", &self.args)
            .field("source", &self.source)
            .finish()
    }
}

impl NamedType {
    pub fn name(&self) -> &str {
        match self {
            NamedType::Object(t) => &t.name,
            NamedType::Interface(t) => &t.name,
            NamedType::Input(t) => &t.name,
            NamedType::Enum(t) => &t.name,
            NamedType::Scalar(t) => &t.name,
            NamedType::Union(t) => &t.name,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            NamedType::Object(t) => t.description.as_deref(),
            NamedType::Interface(t) => t.description.as_deref(),
            NamedType::Input(t) => t.description.as_deref(),
            NamedType::Enum(t) => t.description.as_deref(),
            NamedType::Scalar(t) => t.description.as_deref(),
            NamedType::Union(t) => t.description.as_deref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NamedType::Object(_) => "object",
            NamedType::Interface(_) => "interface",
            NamedType::Input(_) => "input",
            NamedType::Enum(_) => "enum",
            NamedType::Scalar(_) => "scalar",
            NamedType::Union(_) => "union",
        }
    }

    /// The native class behind the node, if there is one.
    pub fn class(&self) -> Option<&ClassRef> {
        match self {
            NamedType::Object(t) => Some(&t.class),
            NamedType::Interface(t) => Some(&t.class),
            NamedType::Input(t) => Some(&t.class),
            NamedType::Enum(t) => Some(&t.class),
            NamedType::Scalar(_) | NamedType::Union(_) => None,
        }
    }

    /// Whether every lazy part of the node has been filled in.
    pub fn is_realized(&self) -> bool {
        match self {
            NamedType::Object(t) => t.fields.get().is_some() && t.interfaces.get().is_some(),
            NamedType::Interface(t) => t.fields.get().is_some(),
            NamedType::Input(t) => t.fields.get().is_some(),
            NamedType::Union(t) => t.members.get().is_some(),
            NamedType::Enum(_) | NamedType::Scalar(_) => true,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            NamedType::Object(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_interface(&self) -> Option<&InterfaceType> {
        match self {
            NamedType::Interface(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_input(&self) -> Option<&InputType> {
        match self {
            NamedType::Input(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumType> {
        match self {
            NamedType::Enum(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarType> {
        match self {
            NamedType::Scalar(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&UnionType> {
        match self {
            NamedType::Union(t) => Some(t),
            _ => None,
        }
    }

    /// Output fields of objects and interfaces.
    pub fn fields(&self) -> &IndexMap<String, FieldDef> {
        match self {
            NamedType::Object(t) => t.fields(),
            NamedType::Interface(t) => t.fields(),
            _ => &*NO_FIELDS,
        }
    }

    /// Named types this node points at directly.
    fn referenced_types(&self) -> Vec<Arc<NamedType>> {
        fn push_fields(fields: &IndexMap<String, FieldDef>, out: &mut Vec<Arc<NamedType>>) {
            for field in fields.values() {
                out.push(field.ty.named_type().clone());
                out.extend(field.args.values().map(|a| a.ty.named_type().clone()));
            }
        }
        let mut out = Vec::new();
        match self {
            NamedType::Object(t) => {
                push_fields(t.fields(), &mut out);
                out.extend(t.interfaces().iter().cloned());
            }
            NamedType::Interface(t) => push_fields(t.fields(), &mut out),
            NamedType::Input(t) => out.extend(t.fields().values().map(|f| f.ty.named_type().clone())),
            NamedType::Union(t) => out.extend(t.members().iter().cloned()),
            NamedType::Enum(_) | NamedType::Scalar(_) => {}
        }
        out
    }
}

impl fmt::Debug for NamedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.name())
    }
}

impl ObjectType {
    pub fn fields(&self) -> &IndexMap<String, FieldDef> {
        self.fields.get().unwrap_or(&*NO_FIELDS)
    }

    /// Interfaces this object declares.
    pub fn interfaces(&self) -> &[Arc<NamedType>] {
        self.interfaces.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Runtime type check used to pick the concrete type of an abstract
    /// result.
    pub fn is_type_of(&self, value: &Value) -> bool {
        value.is_instance_of(&self.class)
    }
}

impl InterfaceType {
    pub fn fields(&self) -> &IndexMap<String, FieldDef> {
        self.fields.get().unwrap_or(&*NO_FIELDS)
    }
}

impl InputType {
    pub fn fields(&self) -> &IndexMap<String, InputFieldDef> {
        self.fields.get().unwrap_or(&*NO_INPUT_FIELDS)
    }

    /// Build the native record from wire-supplied field values.
    pub fn construct(&self, fields: Args) -> anyhow::Result<Value> {
        self.class.construct(fields)
    }
}

impl UnionType {
    pub fn members(&self) -> &[Arc<NamedType>] {
        self.members.get().map(Vec::as_slice).unwrap_or(&[])
    }
}

impl ScalarType {
    pub fn serialize(&self, value: &Value) -> anyhow::Result<serde_json::Value> {
        self.hooks.serialize(value)
    }

    pub fn parse_value(&self, wire: &serde_json::Value) -> anyhow::Result<Value> {
        self.hooks.parse_value(wire)
    }

    pub fn parse_literal(&self, literal: &Literal) -> anyhow::Result<Value> {
        self.hooks.parse_literal(literal)
    }
}

impl EnumType {
    /// Output name of a value: an enum member of this class, or a raw
    /// underlying value.
    pub fn serialize(&self, value: &Value) -> anyhow::Result<String> {
        if let Value::Enum(member) = value {
            if member.class() == &self.class {
                return Ok(member.name().to_string());
            }
        }
        self.values
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| anyhow!("Enum \"{}\" cannot represent value: {value:?}", self.name))
    }

    pub fn parse_value(&self, wire: &serde_json::Value) -> anyhow::Result<Value> {
        match wire.as_str() {
            Some(name) => self.parse_name(name),
            None => bail!("Enum \"{}\" cannot represent non-string value: {wire}", self.name),
        }
    }

    pub fn parse_literal(&self, literal: &Literal) -> anyhow::Result<Value> {
        match literal {
            Literal::Enum(name) => self.parse_name(name.as_str()),
            Literal::String(name) => self.parse_name(name),
            other => bail!("Enum \"{}\" cannot represent non-enum value: {other}", self.name),
        }
    }

    /// Name → underlying value → the native member carrying it.
    fn parse_name(&self, name: &str) -> anyhow::Result<Value> {
        let underlying = self
            .values
            .get(name)
            .ok_or_else(|| anyhow!("Value \"{name}\" does not exist in \"{}\" enum.", self.name))?;
        self.class
            .variant_by_value(underlying)
            .ok_or_else(|| anyhow!("\"{}\" has no member with value {underlying:?}", self.class.name()))
    }
}

// ————— SCHEMA ————

pub struct Schema {
    query: Arc<NamedType>,
    mutation: Option<Arc<NamedType>>,
    types: Vec<Arc<NamedType>>,
    type_map: IndexMap<String, Arc<NamedType>>,
}

impl Schema {
    /// Close over every type reachable from the roots and the extra types,
    /// rejecting two distinct nodes under one name.
    pub fn new(
        query: Arc<NamedType>,
        mutation: Option<Arc<NamedType>>,
        types: Vec<Arc<NamedType>>,
    ) -> Result<Self> {
        let roots = std::iter::once(query.clone())
            .chain(mutation.clone())
            .chain(types.iter().cloned());
        let type_map = collect_types(roots)?;
        Ok(Schema { query, mutation, types, type_map })
    }

    pub fn query(&self) -> &Arc<NamedType> {
        &self.query
    }

    pub fn mutation(&self) -> Option<&Arc<NamedType>> {
        self.mutation.as_ref()
    }

    /// Implementers included without being referenced from the roots.
    pub fn types(&self) -> &[Arc<NamedType>] {
        &self.types
    }

    pub fn type_map(&self) -> &IndexMap<String, Arc<NamedType>> {
        &self.type_map
    }

    pub fn get_type(&self, name: &str) -> Option<&Arc<NamedType>> {
        self.type_map.get(name)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("query", &self.query)
            .field("mutation", &self.mutation)
            .field("types", &self.type_map.values().collect::<Vec<_>>())
            .finish()
    }
}

fn collect_types(
    roots: impl Iterator<Item = Arc<NamedType>>,
) -> Result<IndexMap<String, Arc<NamedType>>> {
    let mut map: IndexMap<String, Arc<NamedType>> = IndexMap::new();
    let mut stack: Vec<Arc<NamedType>> = roots.collect();
    stack.reverse();
    while let Some(ty) = stack.pop() {
        match map.get(ty.name()) {
            Some(seen) if Arc::ptr_eq(seen, &ty) => continue,
            Some(_) => return Err(SchemaError::ConflictingTypeName { name: ty.name().to_string() }),
            None => {}
        }
        map.insert(ty.name().to_string(), ty.clone());
        let mut next = ty.referenced_types();
        next.reverse();
        stack.extend(next);
    }
    Ok(map)
}
