// src/fields.rs
//! Member classification for object and interface field maps.
//!
//! Order of precedence, per name:
//! 1. properties, methods and unannotated values, visited in sorted order;
//! 2. explicit annotations, visited last, replacing whatever step 1 made.
//!
//! Names starting with `_` never become fields.

use indexmap::IndexMap;

use crate::annotation::{
    callable_annotations, class_annotations, property_annotation, Annotation, AnnotationOrigin,
    ArgAnnotation,
};
use crate::error::Result;
use crate::native::{ClassRef, Member, Namespace};
use crate::resolver::{attribute_resolver, method_resolver, Resolver};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldSource {
    Property,
    Method,
    /// Attribute typed from its current value.
    InferredAttribute,
    /// Attribute with an explicit annotation.
    Attribute,
}

#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    pub name: String,
    pub annotation: Annotation,
    pub args: Vec<ArgAnnotation>,
    pub description: Option<String>,
    pub source: FieldSource,
    pub resolver: Resolver,
}

pub fn describe_fields(class: &ClassRef, ns: &Namespace) -> Result<Vec<FieldDescriptor>> {
    let hints = class_annotations(class, ns)?;
    let mut fields: IndexMap<String, FieldDescriptor> = IndexMap::new();

    for (name, member) in class.dir() {
        if name.starts_with('_') {
            continue;
        }
        let field = match member {
            Member::Property(property) => FieldDescriptor {
                annotation: property_annotation(class, &property, ns)?,
                args: Vec::new(),
                description: property.docstring().map(str::to_string),
                source: FieldSource::Property,
                resolver: attribute_resolver(&name),
                name,
            },
            Member::Method(method) => {
                let sig = callable_annotations(class, &method, ns)?;
                FieldDescriptor {
                    annotation: sig.returns,
                    args: sig.args,
                    description: method.docstring().map(str::to_string),
                    source: FieldSource::Method,
                    resolver: method_resolver(&method),
                    name,
                }
            }
            Member::Value(_) if hints.contains_key(&name) => continue,
            Member::Value(value) => {
                let origin = AnnotationOrigin::new(class.name(), &name);
                let mut annotation = Annotation::of_class(&value.class());
                annotation.origin = Some(origin);
                FieldDescriptor {
                    annotation,
                    args: Vec::new(),
                    description: None,
                    source: FieldSource::InferredAttribute,
                    resolver: attribute_resolver(&name),
                    name,
                }
            }
        };
        fields.insert(field.name.clone(), field);
    }

    for (name, annotation) in hints {
        if name.starts_with('_') {
            continue;
        }
        let field = FieldDescriptor {
            annotation,
            args: Vec::new(),
            description: None,
            source: FieldSource::Attribute,
            resolver: attribute_resolver(&name),
            name: name.clone(),
        };
        fields.insert(name, field);
    }

    Ok(fields.into_values().collect())
}
