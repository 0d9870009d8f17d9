// src/scalar.rs
//! Scalars: the built-in primitives and the caller-supplied registry.
pub mod wire;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use async_graphql::Value as Literal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::native::{ClassId, ClassRef, Primitive, Value};
use crate::schema::{NamedType, ScalarType};

type SerializeFn = dyn Fn(&Value) -> Result<serde_json::Value> + Send + Sync;
type ParseValueFn = dyn Fn(&serde_json::Value) -> Result<Value> + Send + Sync;
type ParseLiteralFn = dyn Fn(&Literal) -> Result<Value> + Send + Sync;

/// serialize / parse-value / parse-literal, shared verbatim by alias
/// re-skins of a scalar.
#[derive(Clone)]
pub struct ScalarHooks {
    serialize: Arc<SerializeFn>,
    parse_value: Arc<ParseValueFn>,
    parse_literal: Arc<ParseLiteralFn>,
}

impl ScalarHooks {
    /// Literal parsing defaults to converting the literal to its wire form
    /// and running `parse_value` on it.
    pub fn new(
        serialize: impl Fn(&Value) -> Result<serde_json::Value> + Send + Sync + 'static,
        parse_value: impl Fn(&serde_json::Value) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        let parse_value: Arc<ParseValueFn> = Arc::new(parse_value);
        let via_wire = parse_value.clone();
        ScalarHooks {
            serialize: Arc::new(serialize),
            parse_value,
            parse_literal: Arc::new(move |literal| via_wire(&wire::literal_to_wire(literal)?)),
        }
    }

    pub fn with_parse_literal(
        mut self,
        parse_literal: impl Fn(&Literal) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.parse_literal = Arc::new(parse_literal);
        self
    }

    pub fn serialize(&self, value: &Value) -> Result<serde_json::Value> {
        (self.serialize)(value)
    }

    pub fn parse_value(&self, wire: &serde_json::Value) -> Result<Value> {
        (self.parse_value)(wire)
    }

    pub fn parse_literal(&self, literal: &Literal) -> Result<Value> {
        (self.parse_literal)(literal)
    }
}

impl fmt::Debug for ScalarHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ScalarHooks(..)")
    }
}

// ---- Built-ins ---- //

fn int_hooks() -> ScalarHooks {
    fn to_i32(value: &Value) -> Result<i32> {
        let n = match value {
            Value::Int(i) => *i,
            Value::Bool(b) => i64::from(*b),
            Value::Float(x) if x.fract() == 0.0 => *x as i64,
            other => bail!("Int cannot represent non-integer value: {other:?}"),
        };
        i32::try_from(n).map_err(|_| anyhow!("Int cannot represent non 32-bit signed integer value: {n}"))
    }
    ScalarHooks::new(
        |value| Ok(serde_json::Value::from(to_i32(value)?)),
        |wire| match wire.as_i64() {
            Some(n) if i32::try_from(n).is_ok() => Ok(Value::Int(n)),
            _ => bail!("Int cannot represent value: {wire}"),
        },
    )
}

fn float_hooks() -> ScalarHooks {
    ScalarHooks::new(
        |value| match value {
            Value::Bool(b) => Ok(serde_json::Value::from(if *b { 1.0 } else { 0.0 })),
            other => other
                .as_float()
                .map(serde_json::Value::from)
                .ok_or_else(|| anyhow!("Float cannot represent non numeric value: {other:?}")),
        },
        |wire| match wire.as_f64() {
            Some(x) => Ok(Value::Float(x)),
            None => bail!("Float cannot represent value: {wire}"),
        },
    )
}

fn string_hooks() -> ScalarHooks {
    ScalarHooks::new(
        |value| match value {
            Value::Str(s) => Ok(serde_json::Value::from(s.as_str())),
            Value::Int(i) => Ok(serde_json::Value::from(i.to_string())),
            Value::Float(x) => Ok(serde_json::Value::from(x.to_string())),
            Value::Bool(b) => Ok(serde_json::Value::from(if *b { "true" } else { "false" })),
            other => bail!("String cannot represent value: {other:?}"),
        },
        |wire| match wire.as_str() {
            Some(s) => Ok(Value::from(s)),
            None => bail!("String cannot represent a non string value: {wire}"),
        },
    )
}

fn boolean_hooks() -> ScalarHooks {
    ScalarHooks::new(
        |value| match value {
            Value::Bool(b) => Ok(serde_json::Value::from(*b)),
            Value::Int(i) => Ok(serde_json::Value::from(*i != 0)),
            other => bail!("Boolean cannot represent a non boolean value: {other:?}"),
        },
        |wire| match wire.as_bool() {
            Some(b) => Ok(Value::Bool(b)),
            None => bail!("Boolean cannot represent a non boolean value: {wire}"),
        },
    )
}

fn builtin(primitive: Primitive) -> ScalarType {
    let (name, hooks) = match primitive {
        Primitive::Int => ("Int", int_hooks()),
        Primitive::Float => ("Float", float_hooks()),
        Primitive::Str => ("String", string_hooks()),
        Primitive::Bool => ("Boolean", boolean_hooks()),
    };
    ScalarType { name: name.to_string(), description: None, hooks }
}

// ---- Custom scalars ---- //

/// A caller-registered scalar bridging a native class and its wire form.
#[derive(Clone, Debug)]
pub struct ScalarDescriptor {
    name: String,
    description: Option<String>,
    native: ClassRef,
    hooks: ScalarHooks,
}

impl ScalarDescriptor {
    pub fn new(
        name: impl Into<String>,
        native: &ClassRef,
        serialize: impl Fn(&Value) -> Result<serde_json::Value> + Send + Sync + 'static,
        parse_value: impl Fn(&serde_json::Value) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        ScalarDescriptor {
            name: name.into(),
            description: None,
            native: native.clone(),
            hooks: ScalarHooks::new(serialize, parse_value),
        }
    }

    /// Scalar whose values are `Value::Opaque` payloads of type `T`,
    /// carried over the wire through `serde`.
    pub fn serde<T>(name: impl Into<String>, native: &ClassRef) -> Self
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let name = name.into();
        let expected = name.clone();
        let class = native.clone();
        ScalarDescriptor::new(
            name,
            native,
            move |value| {
                let payload = value
                    .downcast_ref::<T>()
                    .ok_or_else(|| anyhow!("{expected} cannot represent value: {value:?}"))?;
                wire::to_wire(payload)
            },
            move |wire| {
                let payload: T = wire::from_wire_with_path(wire)?;
                Ok(Value::opaque(&class, payload))
            },
        )
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn parse_literal(
        mut self,
        parse_literal: impl Fn(&Literal) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.hooks = self.hooks.with_parse_literal(parse_literal);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn native(&self) -> &ClassRef {
        &self.native
    }
}

/// Native class → scalar node. Built-ins are consulted before custom
/// entries.
#[derive(Debug)]
pub struct ScalarRegistry {
    builtins: HashMap<ClassId, Arc<NamedType>>,
    custom: HashMap<ClassId, Arc<NamedType>>,
}

impl Default for ScalarRegistry {
    fn default() -> Self {
        let builtins = [
            (ClassRef::int(), Primitive::Int),
            (ClassRef::float(), Primitive::Float),
            (ClassRef::str(), Primitive::Str),
            (ClassRef::bool(), Primitive::Bool),
        ]
        .into_iter()
        .map(|(class, p)| (class.id(), Arc::new(NamedType::Scalar(builtin(p)))))
        .collect();
        ScalarRegistry { builtins, custom: HashMap::new() }
    }
}

impl ScalarRegistry {
    pub fn new(descriptors: impl IntoIterator<Item = ScalarDescriptor>) -> Self {
        let mut registry = ScalarRegistry::default();
        for descriptor in descriptors {
            registry.register(descriptor);
        }
        registry
    }

    pub fn register(&mut self, descriptor: ScalarDescriptor) {
        debug!(scalar = %descriptor.name, native = %descriptor.native, "registering scalar");
        let node = ScalarType {
            name: descriptor.name,
            description: descriptor.description,
            hooks: descriptor.hooks,
        };
        self.custom.insert(descriptor.native.id(), Arc::new(NamedType::Scalar(node)));
    }

    pub fn builtin(&self, class: &ClassRef) -> Option<&Arc<NamedType>> {
        self.builtins.get(&class.id())
    }

    pub fn custom(&self, class: &ClassRef) -> Option<&Arc<NamedType>> {
        self.custom.get(&class.id())
    }

    pub fn lookup(&self, class: &ClassRef) -> Option<&Arc<NamedType>> {
        self.builtin(class).or_else(|| self.custom(class))
    }
}
