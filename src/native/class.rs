// src/native/class.rs
//! Class declarations: capability flags, members, hints, records, enums and
//! the append-only subclass registry.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use anyhow::{Result, bail};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::trace;

use super::expr::Hint;
use super::value::{EnumMember, Instance, Value};

static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u64);

impl ClassId {
    fn next() -> Self {
        ClassId(NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Built-in primitive kinds with a schema scalar of their own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Int,
    Float,
    Str,
    Bool,
}

// ————— MEMBERS ————

type Getter = dyn Fn(&Value) -> Result<Value> + Send + Sync;
type Body = dyn Fn(&Value, &Args) -> Result<Value> + Send + Sync;

#[derive(Clone)]
pub enum Member {
    Property(Property),
    Method(Method),
    Value(Value),
}

#[derive(Clone)]
pub struct Property {
    name: String,
    doc: Option<String>,
    returns: Hint,
    getter: Arc<Getter>,
}

impl Property {
    pub fn new(
        name: impl Into<String>,
        returns: impl Into<Hint>,
        getter: impl Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Property {
            name: name.into(),
            doc: None,
            returns: returns.into(),
            getter: Arc::new(getter),
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn docstring(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn returns(&self) -> &Hint {
        &self.returns
    }

    pub fn get(&self, receiver: &Value) -> Result<Value> {
        (self.getter)(receiver)
    }
}

#[derive(Clone, Debug)]
pub struct Param {
    pub name: String,
    pub hint: Hint,
    pub default: Option<Value>,
}

impl Param {
    pub fn new(name: impl Into<String>, hint: impl Into<Hint>) -> Self {
        Param { name: name.into(), hint: hint.into(), default: None }
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

#[derive(Clone)]
pub struct Method {
    name: String,
    doc: Option<String>,
    params: Vec<Param>,
    returns: Hint,
    body: Arc<Body>,
}

impl Method {
    pub fn new(
        name: impl Into<String>,
        returns: impl Into<Hint>,
        body: impl Fn(&Value, &Args) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Method {
            name: name.into(),
            doc: None,
            params: Vec::new(),
            returns: returns.into(),
            body: Arc::new(body),
        }
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn docstring(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn returns(&self) -> &Hint {
        &self.returns
    }

    /// Call with keyword arguments. Omitted parameters fall back to their
    /// defaults; anything else missing or unexpected is an error.
    pub fn call(&self, receiver: &Value, mut kwargs: Args) -> Result<Value> {
        let mut bound = Args::default();
        for param in &self.params {
            match kwargs.0.shift_remove(&param.name) {
                Some(value) => bound.insert(&param.name, value),
                None => match &param.default {
                    Some(default) => bound.insert(&param.name, default.clone()),
                    None => bail!("{}() missing required argument: '{}'", self.name, param.name),
                },
            }
        }
        if let Some(extra) = kwargs.0.keys().next() {
            bail!("{}() got an unexpected keyword argument '{extra}'", self.name);
        }
        (self.body)(receiver, &bound)
    }
}

/// Keyword arguments, in the order they were supplied.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args(IndexMap<String, Value>);

impl Args {
    pub fn insert(&mut self, name: &str, value: Value) {
        self.0.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Like [`Args::get`] but a missing argument is an error.
    pub fn require(&self, name: &str) -> Result<&Value> {
        match self.0.get(name) {
            Some(value) => Ok(value),
            None => bail!("missing argument '{name}'"),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Args {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Args(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// ————— CLASSES ————

pub struct ClassDef {
    id: ClassId,
    name: String,
    doc: Option<String>,
    bases: Vec<ClassRef>,
    primitive: Option<Primitive>,
    object: bool,
    interface: bool,
    record: bool,
    enumeration: bool,
    members: IndexMap<String, Member>,
    hints: IndexMap<String, Hint>,
    record_fields: Vec<String>,
    variants: IndexMap<String, Value>,
    subclasses: RwLock<Vec<Weak<ClassDef>>>,
}

/// Shared handle to a finished class. Equality and hashing go by identity.
#[derive(Clone)]
pub struct ClassRef(Arc<ClassDef>);

static INT: Lazy<ClassRef> = Lazy::new(|| ClassDef::builtin("int", Some(Primitive::Int)));
static FLOAT: Lazy<ClassRef> = Lazy::new(|| ClassDef::builtin("float", Some(Primitive::Float)));
static STR: Lazy<ClassRef> = Lazy::new(|| ClassDef::builtin("str", Some(Primitive::Str)));
static BOOL: Lazy<ClassRef> = Lazy::new(|| ClassDef::builtin("bool", Some(Primitive::Bool)));
static NONE_TYPE: Lazy<ClassRef> = Lazy::new(|| ClassDef::builtin("NoneType", None));
static LIST: Lazy<ClassRef> = Lazy::new(|| ClassDef::builtin("list", None));

impl ClassDef {
    pub fn build(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder {
            name: name.into(),
            ..ClassBuilder::default()
        }
    }

    fn builtin(name: &str, primitive: Option<Primitive>) -> ClassRef {
        let mut builder = ClassDef::build(name);
        builder.primitive = primitive;
        builder.finish()
    }
}

#[derive(Default)]
pub struct ClassBuilder {
    name: String,
    doc: Option<String>,
    bases: Vec<ClassRef>,
    primitive: Option<Primitive>,
    object: bool,
    interface: bool,
    record: bool,
    enumeration: bool,
    members: IndexMap<String, Member>,
    hints: IndexMap<String, Hint>,
    declared: Vec<String>,
    variants: IndexMap<String, Value>,
}

impl ClassBuilder {
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn extends(mut self, base: &ClassRef) -> Self {
        self.bases.push(base.clone());
        self
    }

    /// Mark as a schema object type.
    pub fn object(mut self) -> Self {
        self.object = true;
        self
    }

    /// Mark as a schema interface type.
    pub fn interface(mut self) -> Self {
        self.interface = true;
        self
    }

    /// Plain data record: its declared fields become constructor kwargs.
    pub fn record(mut self) -> Self {
        self.record = true;
        self
    }

    pub fn enumeration(mut self) -> Self {
        self.enumeration = true;
        self
    }

    /// Explicit annotation without a class-level value.
    pub fn annotate(mut self, name: impl Into<String>, hint: impl Into<Hint>) -> Self {
        let name = name.into();
        self.declare(&name);
        self.hints.insert(name, hint.into());
        self
    }

    /// Explicit annotation with a class-level value (a record default).
    pub fn attr(mut self, name: impl Into<String>, hint: impl Into<Hint>, value: impl Into<Value>) -> Self {
        let name = name.into();
        self.declare(&name);
        self.hints.insert(name.clone(), hint.into());
        self.members.insert(name, Member::Value(value.into()));
        self
    }

    /// Unannotated class-level value; its type is inferred from the value.
    pub fn value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.insert(name.into(), Member::Value(value.into()));
        self
    }

    pub fn property(mut self, property: Property) -> Self {
        self.members.insert(property.name.clone(), Member::Property(property));
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.members.insert(method.name.clone(), Member::Method(method));
        self
    }

    /// Record field with no annotation.
    pub fn record_field(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.declare(&name);
        self
    }

    pub fn variant(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variants.insert(name.into(), value.into());
        self
    }

    fn declare(&mut self, name: &str) {
        if !self.declared.iter().any(|d| d == name) {
            self.declared.push(name.to_string());
        }
    }

    pub fn finish(self) -> ClassRef {
        let record_fields = if self.record { self.declared } else { Vec::new() };
        let def = Arc::new(ClassDef {
            id: ClassId::next(),
            name: self.name,
            doc: self.doc,
            bases: self.bases,
            primitive: self.primitive,
            object: self.object,
            interface: self.interface,
            record: self.record,
            enumeration: self.enumeration,
            members: self.members,
            hints: self.hints,
            record_fields,
            variants: self.variants,
            subclasses: RwLock::new(Vec::new()),
        });
        for base in &def.bases {
            base.0.subclasses.write().push(Arc::downgrade(&def));
        }
        trace!(class = %def.name, bases = def.bases.len(), "class finished");
        ClassRef(def)
    }
}

impl ClassRef {
    pub fn int() -> ClassRef {
        INT.clone()
    }

    pub fn float() -> ClassRef {
        FLOAT.clone()
    }

    pub fn str() -> ClassRef {
        STR.clone()
    }

    pub fn bool() -> ClassRef {
        BOOL.clone()
    }

    pub fn none_type() -> ClassRef {
        NONE_TYPE.clone()
    }

    pub fn list() -> ClassRef {
        LIST.clone()
    }

    pub fn ptr_eq(&self, other: &ClassRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_subclass_of(&self, other: &ClassRef) -> bool {
        self == other || self.bases.iter().any(|b| b.is_subclass_of(other))
    }

    fn any_in_hierarchy(&self, flag: fn(&ClassDef) -> bool) -> bool {
        flag(&self.0) || self.bases.iter().any(|b| b.any_in_hierarchy(flag))
    }

    pub fn is_object(&self) -> bool {
        self.any_in_hierarchy(|c| c.object)
    }

    pub fn is_interface(&self) -> bool {
        self.any_in_hierarchy(|c| c.interface)
    }

    pub fn is_record(&self) -> bool {
        self.any_in_hierarchy(|c| c.record)
    }

    pub fn is_enum(&self) -> bool {
        self.any_in_hierarchy(|c| c.enumeration)
    }

    /// Method resolution order: depth-first, left to right, keeping the
    /// last occurrence of a repeated class.
    pub fn mro(&self) -> Vec<ClassRef> {
        fn walk(class: &ClassRef, out: &mut Vec<ClassRef>) {
            out.push(class.clone());
            for base in &class.bases {
                walk(base, out);
            }
        }
        let mut all = Vec::new();
        walk(self, &mut all);
        let mut mro: Vec<ClassRef> = Vec::with_capacity(all.len());
        for (i, class) in all.iter().enumerate() {
            if !all[i + 1..].contains(class) {
                mro.push(class.clone());
            }
        }
        mro
    }

    /// Live direct subclasses, in definition order.
    pub fn subclasses(&self) -> Vec<ClassRef> {
        self.0.subclasses.read().iter().filter_map(Weak::upgrade).map(ClassRef).collect()
    }

    pub fn lookup(&self, name: &str) -> Option<Member> {
        self.mro().into_iter().find_map(|c| c.members.get(name).cloned())
    }

    /// Own and inherited members, sorted by name; nearer classes shadow
    /// their ancestors.
    pub fn dir(&self) -> BTreeMap<String, Member> {
        let mut out = BTreeMap::new();
        for class in self.mro() {
            for (name, member) in &class.members {
                out.entry(name.clone()).or_insert_with(|| member.clone());
            }
        }
        out
    }

    /// Own and inherited explicit hints, with the class that declared each.
    /// Base declarations come first; a redeclaration replaces the hint but
    /// keeps its position.
    pub fn all_hints(&self) -> IndexMap<String, (ClassRef, Hint)> {
        let mut out = IndexMap::new();
        for class in self.mro().into_iter().rev() {
            for (name, hint) in &class.hints {
                out.insert(name.clone(), (class.clone(), hint.clone()));
            }
        }
        out
    }

    /// Record fields including those of record bases, base fields first.
    pub fn fields(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for class in self.mro().into_iter().rev() {
            for field in &class.record_fields {
                if !out.contains(field) {
                    out.push(field.clone());
                }
            }
        }
        out
    }

    pub fn variant(&self, name: &str) -> Option<Value> {
        self.variants
            .contains_key(name)
            .then(|| Value::Enum(EnumMember::new(self.clone(), name.to_string())))
    }

    pub fn variant_by_value(&self, value: &Value) -> Option<Value> {
        let (name, _) = self.variants.iter().find(|(_, v)| *v == value)?;
        self.variant(name)
    }

    /// Build a record instance from keyword arguments, falling back to
    /// class-level defaults.
    pub fn construct(&self, kwargs: Args) -> Result<Value> {
        if !self.is_record() {
            bail!("'{}' is not a record and cannot be constructed", self.name);
        }
        let mut kwargs = kwargs.0;
        let mut attrs = IndexMap::new();
        for field in self.fields() {
            let value = match kwargs.shift_remove(&field) {
                Some(value) => value,
                None => match self.lookup(&field) {
                    Some(Member::Value(default)) => default,
                    _ => bail!("{}() missing required argument: '{field}'", self.name),
                },
            };
            attrs.insert(field, value);
        }
        if let Some(extra) = kwargs.keys().next() {
            bail!("{}() got an unexpected keyword argument '{extra}'", self.name);
        }
        Ok(Value::Object(Instance::new(self, attrs)))
    }
}

impl ClassDef {
    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn bases(&self) -> &[ClassRef] {
        &self.bases
    }

    pub fn primitive(&self) -> Option<Primitive> {
        self.primitive
    }

    /// Own hints only; see [`ClassRef::all_hints`] for the inherited view.
    pub fn hints(&self) -> &IndexMap<String, Hint> {
        &self.hints
    }

    pub fn variants(&self) -> &IndexMap<String, Value> {
        &self.variants
    }
}

impl Deref for ClassRef {
    type Target = ClassDef;

    fn deref(&self) -> &ClassDef {
        &self.0
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for ClassRef {}

impl Hash for ClassRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class '{}'>", self.0.name)
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Property(p) => write!(f, "Property({})", p.name),
            Member::Method(m) => write!(f, "Method({})", m.name),
            Member::Value(v) => write!(f, "Value({v:?})"),
        }
    }
}
