// src/builder.rs
//! Type-mapping engine.
//!
//! Annotations are translated top-down into [`TypeNode`]s and memoized by
//! type identity. Named nodes are created first and their field maps are
//! realized afterwards in a worklist loop, which is what lets recursive and
//! mutually recursive types terminate. Once the roots are realized, every
//! interface-capable class reached so far has its subclasses force-included,
//! repeating until no new interface shows up.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use tracing::{debug, trace};

use crate::annotation::unwrap::unquote;
use crate::annotation::{class_annotations, Annotation, AnnotationKind};
use crate::error::{Location, Result, SchemaError};
use crate::fields::describe_fields;
use crate::native::{ClassId, ClassRef, Namespace, TypeExpr, TypeKey};
use crate::scalar::{ScalarDescriptor, ScalarRegistry};
use crate::schema::{
    ArgumentDef, EnumType, FieldDef, InputFieldDef, InputType, InterfaceType, NamedType, ObjectType,
    ScalarType, Schema, TypeNode, UnionType,
};

static UNION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[_a-zA-Z][_a-zA-Z0-9]*$").expect("static pattern"));

/// One-call form of [`SchemaBuilder`].
pub fn make_schema(
    namespace: Namespace,
    query: &ClassRef,
    mutation: Option<&ClassRef>,
    scalars: impl IntoIterator<Item = ScalarDescriptor>,
) -> Result<Schema> {
    let mut builder = SchemaBuilder::new(namespace, query).scalars(scalars);
    if let Some(mutation) = mutation {
        builder = builder.mutation(mutation);
    }
    builder.build()
}

pub struct SchemaBuilder {
    namespace: Namespace,
    query: ClassRef,
    mutation: Option<ClassRef>,
    scalars: ScalarRegistry,
    memo: HashMap<TypeKey, TypeNode>,
    crawled: HashSet<ClassId>,
}

impl SchemaBuilder {
    pub fn new(namespace: Namespace, query: &ClassRef) -> Self {
        SchemaBuilder {
            namespace,
            query: query.clone(),
            mutation: None,
            scalars: ScalarRegistry::default(),
            memo: HashMap::new(),
            crawled: HashSet::new(),
        }
    }

    pub fn mutation(mut self, mutation: &ClassRef) -> Self {
        self.mutation = Some(mutation.clone());
        self
    }

    pub fn scalar(mut self, descriptor: ScalarDescriptor) -> Self {
        self.scalars.register(descriptor);
        self
    }

    pub fn scalars(mut self, descriptors: impl IntoIterator<Item = ScalarDescriptor>) -> Self {
        for descriptor in descriptors {
            self.scalars.register(descriptor);
        }
        self
    }

    pub fn build(mut self) -> Result<Schema> {
        debug!(query = %self.query, mutation = ?self.mutation, "building schema");
        let query_class = self.query.clone();
        let query = self.translate_root(&query_class, "query")?;
        let mutation = match self.mutation.clone() {
            Some(class) => Some(self.translate_root(&class, "mutation")?),
            None => None,
        };
        self.realize_all()?;
        let types = self.discover_implementers()?;
        let schema = Schema::new(query, mutation, types)?;
        debug!(types = schema.type_map().len(), "schema built");
        Ok(schema)
    }

    // ---- Translation ---- //

    /// Memoized translation. A union reached again is re-checked for a
    /// name, since this reference may not carry one.
    pub fn translate(&mut self, ann: &Annotation) -> Result<TypeNode> {
        let key = ann.key();
        if let Some(node) = self.memo.get(&key) {
            trace!(?key, "memo hit");
            if let AnnotationKind::Union(_) = ann.kind {
                union_name(ann)?;
            }
            return Ok(node.clone());
        }
        trace!(?key, "memo miss");
        let node = self.translate_impl(ann)?;
        self.memo.insert(key, node.clone());
        Ok(node)
    }

    /// [`SchemaBuilder::translate`] without the outer non-null layer.
    pub fn translate_unwrapped(&mut self, ann: &Annotation) -> Result<TypeNode> {
        Ok(self.translate(ann)?.unwrap_non_null())
    }

    /// Node already memoized for this annotation's type, if any.
    pub fn cached(&self, ann: &Annotation) -> Option<&TypeNode> {
        self.memo.get(&ann.key())
    }

    fn translate_impl(&mut self, ann: &Annotation) -> Result<TypeNode> {
        Ok(match &ann.kind {
            AnnotationKind::List(element) => TypeNode::non_null(TypeNode::list(self.translate(element)?)),
            AnnotationKind::Optional(inner) => self.translate_unwrapped(inner)?,
            AnnotationKind::Union(members) => TypeNode::non_null(map_union(ann, members)?),
            AnnotationKind::Alias(base) => TypeNode::non_null(self.map_alias(ann, base)?),
            AnnotationKind::Class(class) => TypeNode::non_null(self.map_class(ann, class)?),
        })
    }

    fn translate_root(&mut self, class: &ClassRef, role: &'static str) -> Result<Arc<NamedType>> {
        debug!(%class, role, "translating root");
        match self.translate_unwrapped(&Annotation::of_class(class))? {
            TypeNode::Named(named) if named.as_object().is_some() => Ok(named),
            other => Err(SchemaError::InvalidRoot { role, type_name: other.to_string() }),
        }
    }

    fn map_class(&mut self, ann: &Annotation, class: &ClassRef) -> Result<TypeNode> {
        let named = if class.is_object() {
            map_object(class)
        } else if class.is_interface() {
            map_interface(class)
        } else if class.is_record() {
            map_input(class)
        } else if class.is_enum() {
            map_enum(class)
        } else if let Some(scalar) = self.scalars.lookup(class) {
            scalar.clone()
        } else {
            return Err(SchemaError::Untranslatable {
                type_repr: class.name().to_string(),
                location: ann.origin.as_ref().into(),
            });
        };
        Ok(TypeNode::Named(named))
    }

    /// A scalar base gets a re-skinned scalar named after the alias; any
    /// other base is translated as if the alias were not there.
    fn map_alias(&mut self, ann: &Annotation, base: &Annotation) -> Result<TypeNode> {
        if let AnnotationKind::Class(class) = &base.kind {
            if let Some(NamedType::Scalar(scalar)) = self.scalars.lookup(class).map(AsRef::as_ref) {
                let name = match &ann.resolved {
                    TypeExpr::Alias(alias) => alias.name().to_string(),
                    other => other.to_string(),
                };
                debug!(alias = %name, base = %scalar.name, "aliasing scalar");
                return Ok(TypeNode::Named(Arc::new(NamedType::Scalar(ScalarType {
                    name,
                    description: None,
                    hooks: scalar.hooks.clone(),
                }))));
            }
        }
        self.translate_unwrapped(base)
    }

    // ---- Realization ---- //

    /// Fill in every lazy node in the memo table, including the ones that
    /// filling in creates.
    fn realize_all(&mut self) -> Result<()> {
        loop {
            let pending: Vec<Arc<NamedType>> = self
                .memo
                .values()
                .map(TypeNode::named_type)
                .filter(|named| !named.is_realized())
                .cloned()
                .collect();
            if pending.is_empty() {
                return Ok(());
            }
            for node in pending {
                self.realize(&node)?;
            }
        }
    }

    fn realize(&mut self, node: &Arc<NamedType>) -> Result<()> {
        trace!(name = node.name(), kind = node.kind(), "realizing");
        match node.as_ref() {
            NamedType::Object(t) => {
                t.fields.get_or_try_init(|| self.map_fields(&t.class))?;
                t.interfaces.get_or_try_init(|| self.map_interfaces(&t.class))?;
            }
            NamedType::Interface(t) => {
                t.fields.get_or_try_init(|| self.map_fields(&t.class))?;
            }
            NamedType::Input(t) => {
                t.fields.get_or_try_init(|| self.map_input_fields(&t.class))?;
            }
            NamedType::Union(t) => {
                t.members.get_or_try_init(|| self.map_union_members(&t.name, &t.member_annotations))?;
            }
            NamedType::Enum(_) | NamedType::Scalar(_) => {}
        }
        Ok(())
    }

    fn map_fields(&mut self, class: &ClassRef) -> Result<IndexMap<String, FieldDef>> {
        let descriptors = describe_fields(class, &self.namespace)?;
        let mut fields = IndexMap::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let ty = self.translate(&descriptor.annotation)?;
            let mut args = IndexMap::with_capacity(descriptor.args.len());
            for arg in descriptor.args {
                let arg_ty = self.translate(&arg.annotation)?;
                args.insert(arg.name.clone(), ArgumentDef { name: arg.name, ty: arg_ty, default: arg.default });
            }
            fields.insert(
                descriptor.name.clone(),
                FieldDef {
                    name: descriptor.name,
                    description: descriptor.description,
                    ty,
                    args,
                    source: descriptor.source,
                    resolver: descriptor.resolver,
                },
            );
        }
        Ok(fields)
    }

    fn map_input_fields(&mut self, class: &ClassRef) -> Result<IndexMap<String, InputFieldDef>> {
        let hints = class_annotations(class, &self.namespace)?;
        let mut fields = IndexMap::new();
        for name in class.fields() {
            let Some(ann) = hints.get(&name) else {
                return Err(SchemaError::MissingFieldHint { class: class.name().to_string(), field: name });
            };
            let ty = self.translate(ann)?;
            fields.insert(name.clone(), InputFieldDef { name, ty });
        }
        Ok(fields)
    }

    /// Interface-capable ancestors that are not objects themselves.
    fn map_interfaces(&mut self, class: &ClassRef) -> Result<Vec<Arc<NamedType>>> {
        let mut interfaces = Vec::new();
        for ancestor in class.mro().into_iter().skip(1) {
            if !ancestor.is_interface() || ancestor.is_object() {
                continue;
            }
            if let TypeNode::Named(named) = self.translate_unwrapped(&Annotation::of_class(&ancestor))? {
                if named.as_interface().is_some() {
                    interfaces.push(named);
                }
            }
        }
        Ok(interfaces)
    }

    fn map_union_members(&mut self, union: &str, members: &[Annotation]) -> Result<Vec<Arc<NamedType>>> {
        let mut out = Vec::with_capacity(members.len());
        for member in members {
            match self.translate_unwrapped(member)? {
                TypeNode::Named(named) if named.as_object().is_some() => out.push(named),
                other => {
                    return Err(SchemaError::InvalidUnionMember {
                        union: union.to_string(),
                        member: other.to_string(),
                    });
                }
            }
        }
        Ok(out)
    }

    // ---- Implementer discovery ---- //

    fn discover_implementers(&mut self) -> Result<Vec<Arc<NamedType>>> {
        let mut extra: Vec<Arc<NamedType>> = Vec::new();
        let mut round = 0;
        loop {
            let mut pending: Vec<ClassRef> = self
                .memo
                .values()
                .map(TypeNode::named_type)
                .filter(|named| matches!(named.as_ref(), NamedType::Object(_) | NamedType::Interface(_)))
                .filter_map(|named| named.class())
                .filter(|class| class.is_interface() && !self.crawled.contains(&class.id()))
                .cloned()
                .collect();
            pending.sort_by_key(|class| class.id());
            pending.dedup();
            if pending.is_empty() {
                return Ok(extra);
            }
            round += 1;
            debug!(round, interfaces = pending.len(), "discovering implementers");
            for interface in pending {
                self.crawled.insert(interface.id());
                for implementer in interface.subclasses() {
                    if let TypeNode::Named(named) = self.translate_unwrapped(&Annotation::of_class(&implementer))? {
                        if !extra.iter().any(|seen| Arc::ptr_eq(seen, &named)) {
                            debug!(implementer = named.name(), %interface, "forcing implementer");
                            extra.push(named);
                        }
                    }
                }
            }
            self.realize_all()?;
        }
    }
}

fn map_object(class: &ClassRef) -> Arc<NamedType> {
    Arc::new(NamedType::Object(ObjectType {
        name: class.name().to_string(),
        description: class.doc().map(str::to_string),
        class: class.clone(),
        fields: OnceCell::new(),
        interfaces: OnceCell::new(),
    }))
}

fn map_interface(class: &ClassRef) -> Arc<NamedType> {
    Arc::new(NamedType::Interface(InterfaceType {
        name: class.name().to_string(),
        description: class.doc().map(str::to_string),
        class: class.clone(),
        fields: OnceCell::new(),
    }))
}

fn map_input(class: &ClassRef) -> Arc<NamedType> {
    Arc::new(NamedType::Input(InputType {
        name: class.name().to_string(),
        description: class.doc().map(str::to_string),
        class: class.clone(),
        fields: OnceCell::new(),
    }))
}

fn map_enum(class: &ClassRef) -> Arc<NamedType> {
    Arc::new(NamedType::Enum(EnumType {
        name: class.name().to_string(),
        description: class.doc().map(str::to_string),
        class: class.clone(),
        values: class.variants().clone(),
    }))
}

fn map_union(ann: &Annotation, members: &[Annotation]) -> Result<TypeNode> {
    let name = union_name(ann)?;
    let labels: Vec<String> = members
        .iter()
        .map(|m| match &m.kind {
            AnnotationKind::Class(class) => class.name().to_string(),
            _ => m.resolved.to_string(),
        })
        .collect();
    Ok(TypeNode::Named(Arc::new(NamedType::Union(UnionType {
        name,
        description: Some(format!("One of: {}.", labels.join(", "))),
        member_annotations: members.to_vec(),
        members: OnceCell::new(),
    }))))
}

/// A union is named by its raw hint, which must be a bare identifier
/// (quotes of a forward reference allowed).
fn union_name(ann: &Annotation) -> Result<String> {
    match ann.name().map(unquote) {
        Some(name) if UNION_NAME.is_match(name) => Ok(name.to_string()),
        _ => {
            let members: Vec<String> = ann.resolved.args().iter().map(ToString::to_string).collect();
            Err(SchemaError::UnnamedUnion {
                members: members.join(", "),
                location: Location::from(ann.origin.as_ref()),
            })
        }
    }
}
