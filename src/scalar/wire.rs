// src/scalar/wire.rs
//! Wire conversions for scalar hooks: JSON values, GraphQL literals, and
//! serde payloads with JSON-path context in errors.

use anyhow::{Result, anyhow};
use async_graphql::Value as Literal;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Deserialize a wire value, reporting where in it deserialization failed.
pub fn from_wire_with_path<T: DeserializeOwned>(wire: &serde_json::Value) -> Result<T> {
    serde_path_to_error::deserialize::<_, T>(wire).map_err(|err| {
        let path = err.path().to_string();
        anyhow!("at JSON path {path} → {}", err.into_inner())
    })
}

pub fn to_wire<T: Serialize>(payload: &T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(payload)?)
}

/// A parsed GraphQL literal as the JSON value a variable would carry.
/// Enum literals become their name.
pub fn literal_to_wire(literal: &Literal) -> Result<serde_json::Value> {
    Ok(match literal {
        Literal::Null => serde_json::Value::Null,
        Literal::Boolean(b) => serde_json::Value::Bool(*b),
        Literal::Number(n) => serde_json::to_value(n)?,
        Literal::String(s) => serde_json::Value::String(s.clone()),
        Literal::Enum(name) => serde_json::Value::String(name.to_string()),
        Literal::List(items) => {
            serde_json::Value::Array(items.iter().map(literal_to_wire).collect::<Result<_>>()?)
        }
        Literal::Object(fields) => serde_json::Value::Object(
            fields
                .iter()
                .map(|(k, v)| Ok((k.to_string(), literal_to_wire(v)?)))
                .collect::<Result<_>>()?,
        ),
        Literal::Binary(_) => return Err(anyhow!("binary literals have no wire form")),
    })
}

pub fn wire_to_literal(wire: serde_json::Value) -> Result<Literal> {
    Ok(Literal::from_json(wire)?)
}
