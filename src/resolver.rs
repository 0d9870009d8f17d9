// src/resolver.rs
//! Resolver shims bound to schema fields.
//!
//! Nothing is captured at build time except the member name (or the method
//! itself); every call reads the receiver afresh.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::native::{Args, Method, Value};

/// Execution context handed to resolvers.
#[derive(Clone, Copy, Debug)]
pub struct ResolveInfo<'a> {
    pub parent_type: &'a str,
    pub field_name: &'a str,
}

type ResolverFn = dyn Fn(&Value, &ResolveInfo<'_>, &Args) -> Result<Value> + Send + Sync;

#[derive(Clone)]
pub struct Resolver(Arc<ResolverFn>);

impl Resolver {
    pub fn new(f: impl Fn(&Value, &ResolveInfo<'_>, &Args) -> Result<Value> + Send + Sync + 'static) -> Self {
        Resolver(Arc::new(f))
    }

    pub fn call(&self, receiver: &Value, info: &ResolveInfo<'_>, args: &Args) -> Result<Value> {
        (self.0)(receiver, info, args)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Resolver(..)")
    }
}

/// Read an attribute (or trigger a property) by name.
pub fn attribute_resolver(name: &str) -> Resolver {
    let name = name.to_string();
    Resolver::new(move |receiver, _, _| receiver.getattr(&name))
}

/// Invoke a method on the receiver, matching wire arguments to parameters
/// by name.
pub fn method_resolver(method: &Method) -> Resolver {
    let method = method.clone();
    Resolver::new(move |receiver, _, args| method.call(receiver, args.clone()))
}
