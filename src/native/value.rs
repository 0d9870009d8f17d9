// src/native/value.rs
//! Dynamically typed runtime values handed to and returned by resolvers.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use indexmap::IndexMap;

use super::class::{ClassRef, Member};

pub(crate) static NULL: Value = Value::Null;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Object(Instance),
    Enum(EnumMember),
    /// Arbitrary payload tagged with its native class (custom scalars).
    Opaque {
        class: ClassRef,
        payload: Arc<dyn Any + Send + Sync>,
    },
}

/// An instance of a declared class: the class plus its own attributes.
#[derive(Clone)]
pub struct Instance(Arc<InstanceData>);

struct InstanceData {
    class: ClassRef,
    attrs: IndexMap<String, Value>,
}

impl Instance {
    pub fn new(class: &ClassRef, attrs: IndexMap<String, Value>) -> Self {
        Instance(Arc::new(InstanceData { class: class.clone(), attrs }))
    }

    pub fn class(&self) -> &ClassRef {
        &self.0.class
    }

    /// Own attribute only; no class-level or property lookup.
    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.0.attrs.get(name)
    }

    pub fn attrs(&self) -> &IndexMap<String, Value> {
        &self.0.attrs
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// One variant of an enumeration class.
#[derive(Clone)]
pub struct EnumMember {
    class: ClassRef,
    name: String,
}

impl EnumMember {
    pub(crate) fn new(class: ClassRef, name: String) -> Self {
        EnumMember { class, name }
    }

    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying value the variant was declared with.
    pub fn value(&self) -> &Value {
        self.class.variants().get(&self.name).unwrap_or(&NULL)
    }
}

impl Value {
    pub fn object(class: &ClassRef, attrs: impl IntoIterator<Item = (impl Into<String>, Value)>) -> Self {
        let attrs = attrs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Value::Object(Instance::new(class, attrs))
    }

    pub fn opaque<T: Any + Send + Sync>(class: &ClassRef, payload: T) -> Self {
        Value::Opaque { class: class.clone(), payload: Arc::new(payload) }
    }

    /// Runtime class, used for inferring attribute types from values.
    pub fn class(&self) -> ClassRef {
        match self {
            Value::Null => ClassRef::none_type(),
            Value::Bool(_) => ClassRef::bool(),
            Value::Int(_) => ClassRef::int(),
            Value::Float(_) => ClassRef::float(),
            Value::Str(_) => ClassRef::str(),
            Value::List(_) => ClassRef::list(),
            Value::Object(instance) => instance.class().clone(),
            Value::Enum(member) => member.class().clone(),
            Value::Opaque { class, .. } => class.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_instance_of(&self, class: &ClassRef) -> bool {
        self.class().is_subclass_of(class)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats, widening ints.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumMember> {
        match self {
            Value::Enum(member) => Some(member),
            _ => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Opaque { payload, .. } => payload.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Attribute access: own attributes, then class-level values along the
    /// MRO, then property getters.
    pub fn getattr(&self, name: &str) -> Result<Value> {
        let Value::Object(instance) = self else {
            bail!("'{}' object has no attribute '{name}'", self.class().name());
        };
        if let Some(value) = instance.attr(name) {
            return Ok(value.clone());
        }
        match instance.class().lookup(name) {
            Some(Member::Value(value)) => Ok(value),
            Some(Member::Property(property)) => property.get(self),
            Some(Member::Method(_)) => {
                bail!("'{}.{name}' is a method, not an attribute", instance.class().name())
            }
            None => Err(anyhow!("'{}' object has no attribute '{name}'", instance.class().name())),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Enum(a), Value::Enum(b)) => a.class == b.class && a.name == b.name,
            (Value::Opaque { payload: a, .. }, Value::Opaque { payload: b, .. }) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("None"),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Object(instance) => {
                let mut s = f.debug_struct(instance.class().name());
                for (k, v) in instance.attrs() {
                    s.field(k, v);
                }
                s.finish()
            }
            Value::Enum(member) => write!(f, "{}.{}", member.class().name(), member.name()),
            Value::Opaque { class, .. } => write!(f, "<{} object>", class.name()),
        }
    }
}

// ---- Conversions ---- //

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Object(instance)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}
