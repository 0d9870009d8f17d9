// src/engine.rs
//! Hand a built [`Schema`] to `async-graphql`'s dynamic schema.
//!
//! Native values travel through the engine as `FieldValue::owned_any(Value)`;
//! arguments are coerced through the scalar, enum and input hooks of the
//! argument's type node before a resolver sees them, and results are
//! serialized through the hooks of the field's type node.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use async_graphql::dynamic::{
    self, DynamicRequest, DynamicRequestExt, Enum, EnumItem, Field, FieldFuture, FieldValue,
    InputObject, InputValue, Interface, InterfaceField, Object, ResolverContext, Scalar, TypeRef,
    Union,
};
use async_graphql::{Name, Request, Value as Literal};
use tracing::debug;

use crate::error::SchemaError;
use crate::native::{Args, Value};
use crate::resolver::ResolveInfo;
use crate::scalar::wire::wire_to_literal;
use crate::schema::{ArgumentDef, FieldDef, NamedType, Schema, TypeNode};

/// Scalars the engine already knows.
const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// Attach a native root value to a request.
pub fn root_request(request: impl Into<Request>, root: Value) -> DynamicRequest {
    let request: Request = request.into();
    request.root_value(FieldValue::owned_any(root))
}

impl Schema {
    /// Build the executable `async-graphql` schema.
    pub fn executable(&self) -> Result<dynamic::Schema, SchemaError> {
        let possible = Arc::new(PossibleTypes::new(self));
        let mut builder = dynamic::Schema::build(
            self.query().name(),
            self.mutation().map(|m| m.name()),
            None,
        );
        let is_root = |name: &str| {
            self.query().name() == name || self.mutation().is_some_and(|m| m.name() == name)
        };
        for named in self.type_map().values() {
            builder = match named.as_ref() {
                NamedType::Object(t) => {
                    let root = is_root(t.name.as_str());
                    let mut object = Object::new(t.name.as_str());
                    if let Some(description) = &t.description {
                        object = object.description(description.as_str());
                    }
                    for interface in t.interfaces() {
                        object = object.implement(interface.name());
                    }
                    for field in t.fields().values() {
                        object = object.field(output_field(&t.name, root, field, &possible));
                    }
                    builder.register(object)
                }
                NamedType::Interface(t) => {
                    let mut interface = Interface::new(t.name.as_str());
                    if let Some(description) = &t.description {
                        interface = interface.description(description.as_str());
                    }
                    for field in t.fields().values() {
                        let mut iface_field = InterfaceField::new(field.name.as_str(), type_ref(&field.ty));
                        if let Some(description) = &field.description {
                            iface_field = iface_field.description(description.as_str());
                        }
                        for arg in field.args.values() {
                            iface_field = iface_field.argument(input_value(arg));
                        }
                        interface = interface.field(iface_field);
                    }
                    builder.register(interface)
                }
                NamedType::Input(t) => {
                    let mut input = InputObject::new(t.name.as_str());
                    if let Some(description) = &t.description {
                        input = input.description(description.as_str());
                    }
                    for field in t.fields().values() {
                        input = input.field(InputValue::new(field.name.as_str(), type_ref(&field.ty)));
                    }
                    builder.register(input)
                }
                NamedType::Enum(t) => {
                    let mut enumeration = Enum::new(t.name.as_str());
                    if let Some(description) = &t.description {
                        enumeration = enumeration.description(description.as_str());
                    }
                    for name in t.values.keys() {
                        enumeration = enumeration.item(EnumItem::new(name.as_str()));
                    }
                    builder.register(enumeration)
                }
                NamedType::Scalar(t) if BUILTIN_SCALARS.contains(&t.name.as_str()) => builder,
                NamedType::Scalar(t) => {
                    let mut scalar = Scalar::new(t.name.as_str());
                    if let Some(description) = &t.description {
                        scalar = scalar.description(description.as_str());
                    }
                    let hooks = t.hooks.clone();
                    builder.register(scalar.validator(move |literal| hooks.parse_literal(literal).is_ok()))
                }
                NamedType::Union(t) => {
                    let mut union = Union::new(t.name.as_str());
                    if let Some(description) = &t.description {
                        union = union.description(description.as_str());
                    }
                    for member in t.members() {
                        union = union.possible_type(member.name());
                    }
                    builder.register(union)
                }
            };
        }
        debug!(types = self.type_map().len(), "registering with execution engine");
        builder.finish().map_err(|err| SchemaError::Engine(err.to_string()))
    }

    /// Schema definition language text.
    pub fn sdl(&self) -> Result<String, SchemaError> {
        Ok(self.executable()?.sdl())
    }
}

fn type_ref(node: &TypeNode) -> TypeRef {
    match node {
        TypeNode::Named(named) => TypeRef::Named(named.name().to_string().into()),
        TypeNode::List(inner) => TypeRef::List(Box::new(type_ref(inner))),
        TypeNode::NonNull(inner) => TypeRef::NonNull(Box::new(type_ref(inner))),
    }
}

fn input_value(arg: &ArgumentDef) -> InputValue {
    let input = InputValue::new(arg.name.as_str(), type_ref(&arg.ty));
    match arg.default.as_ref().and_then(|d| default_literal(&arg.ty, d)) {
        Some(default) => input.default_value(default),
        None => input,
    }
}

/// Render a native default for the SDL; defaults with no literal form are
/// left to the resolver.
fn default_literal(ty: &TypeNode, value: &Value) -> Option<Literal> {
    match ty {
        TypeNode::NonNull(inner) => default_literal(inner, value),
        _ if value.is_null() => Some(Literal::Null),
        TypeNode::List(inner) => value
            .as_list()?
            .iter()
            .map(|item| default_literal(inner, item))
            .collect::<Option<Vec<_>>>()
            .map(Literal::List),
        TypeNode::Named(named) => match named.as_ref() {
            NamedType::Scalar(scalar) => wire_to_literal(scalar.serialize(value).ok()?).ok(),
            NamedType::Enum(enumeration) => {
                enumeration.serialize(value).ok().map(|name| Literal::Enum(Name::new(name)))
            }
            _ => None,
        },
    }
}

fn output_field(parent: &str, root: bool, def: &FieldDef, possible: &Arc<PossibleTypes>) -> Field {
    let parent_type = parent.to_string();
    let bound = def.clone();
    let possible = possible.clone();
    let mut field = Field::new(def.name.as_str(), type_ref(&def.ty), move |ctx| {
        let result = resolve_field(&parent_type, root, &bound, &possible, &ctx);
        FieldFuture::new(async move { result })
    });
    if let Some(description) = &def.description {
        field = field.description(description.as_str());
    }
    for arg in def.args.values() {
        field = field.argument(input_value(arg));
    }
    field
}

fn resolve_field<'a>(
    parent_type: &str,
    root: bool,
    def: &FieldDef,
    possible: &PossibleTypes,
    ctx: &ResolverContext<'_>,
) -> async_graphql::Result<Option<FieldValue<'a>>> {
    let receiver = receiver(ctx.parent_value, parent_type, root, &def.name).map_err(engine_error)?;
    let mut args = Args::default();
    for (name, arg) in &def.args {
        match ctx.args.get(name) {
            Some(supplied) => {
                let value = coerce_input(&arg.ty, supplied.as_value()).map_err(engine_error)?;
                args.insert(name, value);
            }
            None if arg.default.is_none() && !arg.ty.is_non_null() => args.insert(name, Value::Null),
            None => {}
        }
    }
    let info = ResolveInfo { parent_type, field_name: &def.name };
    let value = def.resolver.call(receiver, &info, &args).map_err(engine_error)?;
    to_output(&def.ty, value, possible).map_err(engine_error)
}

/// The native value a field is resolved against. Only a root type may
/// run without one (no root value attached), and then sees `None`.
fn receiver<'v>(parent: &'v FieldValue<'_>, parent_type: &str, root: bool, field: &str) -> Result<&'v Value> {
    match parent.downcast_ref::<Value>() {
        Some(value) => Ok(value),
        None if root => Ok(&crate::native::value::NULL),
        None => bail!("{parent_type}.{field}: parent is not a native value"),
    }
}

fn engine_error(err: anyhow::Error) -> async_graphql::Error {
    async_graphql::Error::new(format!("{err:#}"))
}

// ---- Input coercion ---- //

fn coerce_input(ty: &TypeNode, literal: &Literal) -> Result<Value> {
    match ty {
        TypeNode::NonNull(inner) => coerce_input(inner, literal),
        _ if matches!(literal, Literal::Null) => Ok(Value::Null),
        TypeNode::List(inner) => match literal {
            Literal::List(items) => {
                items.iter().map(|item| coerce_input(inner, item)).collect::<Result<Vec<_>>>().map(Value::List)
            }
            single => Ok(Value::List(vec![coerce_input(inner, single)?])),
        },
        TypeNode::Named(named) => match named.as_ref() {
            // ID accepts integer input.
            NamedType::Scalar(scalar) if scalar.name == "ID" && matches!(literal, Literal::Number(_)) => {
                Ok(Value::Str(literal.to_string()))
            }
            NamedType::Scalar(scalar) => scalar.parse_literal(literal),
            NamedType::Enum(enumeration) => enumeration.parse_literal(literal),
            NamedType::Input(input) => {
                let Literal::Object(supplied) = literal else {
                    bail!("expected an object for input type \"{}\", got {literal}", input.name);
                };
                let mut fields = Args::default();
                for (name, field) in input.fields() {
                    if let Some(value) = supplied.get(name.as_str()) {
                        fields.insert(name, coerce_input(&field.ty, value)?);
                    }
                }
                input.construct(fields)
            }
            other => bail!("\"{}\" is not an input type", other.name()),
        },
    }
}

// ---- Output ---- //

fn to_output<'a>(ty: &TypeNode, value: Value, possible: &PossibleTypes) -> Result<Option<FieldValue<'a>>> {
    match ty {
        TypeNode::NonNull(inner) => to_output(inner, value, possible),
        _ if value.is_null() => Ok(None),
        TypeNode::List(inner) => {
            let Value::List(items) = value else {
                bail!("expected a list, got {value:?}");
            };
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(to_output(inner, item, possible)?.unwrap_or(FieldValue::NULL));
            }
            Ok(Some(FieldValue::list(out)))
        }
        TypeNode::Named(named) => Ok(Some(match named.as_ref() {
            NamedType::Scalar(scalar) => FieldValue::value(wire_to_literal(scalar.serialize(&value)?)?),
            NamedType::Enum(enumeration) => {
                FieldValue::value(Literal::Enum(Name::new(enumeration.serialize(&value)?)))
            }
            // Only abstract results carry a type name; a concrete object
            // stays a bare `Value` for its child resolvers to downcast.
            NamedType::Object(_) => FieldValue::owned_any(value),
            NamedType::Interface(_) | NamedType::Union(_) => {
                let concrete = possible.resolve(named.name(), &value)?;
                FieldValue::owned_any(value).with_type(concrete)
            }
            NamedType::Input(input) => bail!("input type \"{}\" used as output", input.name),
        })),
    }
}

/// Object types that can stand in for each abstract type.
struct PossibleTypes(HashMap<String, Vec<Arc<NamedType>>>);

impl PossibleTypes {
    fn new(schema: &Schema) -> Self {
        let mut map: HashMap<String, Vec<Arc<NamedType>>> = HashMap::new();
        for named in schema.type_map().values() {
            match named.as_ref() {
                NamedType::Object(object) => {
                    for interface in object.interfaces() {
                        map.entry(interface.name().to_string()).or_default().push(named.clone());
                    }
                }
                NamedType::Union(union) => {
                    map.entry(union.name.clone()).or_default().extend(union.members().iter().cloned());
                }
                _ => {}
            }
        }
        PossibleTypes(map)
    }

    /// Exact class first, then the first object whose instance check
    /// passes.
    fn resolve(&self, abstract_type: &str, value: &Value) -> Result<String> {
        let candidates = self.0.get(abstract_type).map(Vec::as_slice).unwrap_or(&[]);
        let class = value.class();
        let objects = || candidates.iter().filter_map(|c| c.as_object());
        objects()
            .find(|object| object.class == class)
            .or_else(|| objects().find(|object| object.is_type_of(value)))
            .map(|object| object.name.clone())
            .ok_or_else(|| {
                anyhow!(
                    "Abstract type \"{abstract_type}\" must resolve to an object type at runtime; \
                     no possible type matches a value of class \"{}\"",
                    class.name()
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::make_schema;
    use crate::native::{ClassDef, ClassRef, Method, Namespace, Param};

    fn schema() -> Schema {
        let color = ClassDef::build("Color").enumeration().variant("RED", 1).variant("BLUE", 2).finish();
        let query = ClassDef::build("Query")
            .object()
            .method(
                Method::new("paint", "List[Color]", |_, args| Ok(args.require("colors")?.clone()))
                    .param(Param::new("colors", "List[Color]"))
                    .param(Param::new("times", "int").default(2))
                    .param(Param::new("tag", "Optional[str]").default(Value::Null)),
            )
            .finish();
        make_schema(Namespace::with_classes([&color]), &query, None, []).unwrap()
    }

    #[test]
    fn single_values_are_wrapped_into_lists() {
        let schema = schema();
        let arg = &schema.query().fields()["paint"].args["colors"];
        let value = coerce_input(&arg.ty, &Literal::Enum(Name::new("BLUE"))).unwrap();
        let items = value.as_list().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_enum().unwrap().name(), "BLUE");
        assert!(coerce_input(&arg.ty, &Literal::Enum(Name::new("GREEN"))).is_err());
    }

    #[test]
    fn defaults_render_as_literals() {
        let schema = schema();
        let args = &schema.query().fields()["paint"].args;
        let times = &args["times"];
        assert_eq!(default_literal(&times.ty, times.default.as_ref().unwrap()), Some(Literal::from(2)));
        let tag = &args["tag"];
        assert_eq!(tag.ty.to_string(), "String");
        assert_eq!(default_literal(&tag.ty, &Value::Null), Some(Literal::Null));
    }

    fn nested() -> (ClassRef, dynamic::Schema) {
        let point = ClassDef::build("Point").object().annotate("x", "int").annotate("next", "Optional[Point]").finish();
        let make = point.clone();
        let query = ClassDef::build("Query")
            .object()
            .method(Method::new("origin", "Point", move |_, _| {
                let next = Value::object(&make, [("x", Value::from(8)), ("next", Value::Null)]);
                Ok(Value::object(&make, [("x", Value::from(7)), ("next", next)]))
            }))
            .method(Method::new("ping", "str", |_, _| Ok(Value::from("pong"))))
            .finish();
        let schema = make_schema(Namespace::with_classes([&point]), &query, None, []).unwrap();
        (query, schema.executable().unwrap())
    }

    #[tokio::test]
    async fn nested_object_fields_read_their_parent() {
        let (query, schema) = nested();
        let root = Value::object(&query, Vec::<(&str, Value)>::new());
        let response = schema.execute(root_request("{ origin { x next { x next { x } } } }", root)).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data.into_json().unwrap(),
            serde_json::json!({"origin": {"x": 7, "next": {"x": 8, "next": null}}})
        );
    }

    #[tokio::test]
    async fn root_fields_run_without_a_root_value() {
        let (_, schema) = nested();
        let response = schema.execute("{ ping }").await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(response.data.into_json().unwrap(), serde_json::json!({"ping": "pong"}));
    }

    #[test]
    fn missing_receiver_is_an_error_below_the_root() {
        let parent = FieldValue::NULL;
        assert!(receiver(&parent, "Query", true, "ping").unwrap().is_null());
        let err = receiver(&parent, "Point", false, "x").unwrap_err();
        assert!(err.to_string().contains("Point.x"), "got: {err}");

        let value = FieldValue::owned_any(Value::from(3));
        assert_eq!(receiver(&value, "Point", false, "x").unwrap(), &Value::Int(3));
    }

    #[test]
    fn sdl_carries_argument_defaults() {
        let sdl = schema().sdl().unwrap();
        assert!(sdl.contains("enum Color"), "{sdl}");
        assert!(sdl.contains("times: Int! = 2"), "{sdl}");
    }
}
