//! `$ref` resolution against `components.schemas`

use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::constants::MAX_REF_DEPTH;

const COMPONENT_PREFIX: &str = "#/components/schemas/";

/// Why a single endpoint could not be loaded
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("$ref nesting exceeds {0} levels")]
    RefDepthExceeded(usize),
    #[error("operation {method} {path} is not an object")]
    MalformedOperation { method: String, path: String },
}

/// Component name for a `#/components/schemas/<name>` reference
pub fn ref_name(reference: &str) -> Option<&str> {
    reference
        .strip_prefix(COMPONENT_PREFIX)
        .filter(|name| !name.is_empty())
}

/// Replace every `$ref` in a schema fragment with the referenced component,
/// following nested `properties`, `items` and `additionalProperties`.
/// A reference to an unknown component becomes a free-form object.
pub fn resolve(node: &Value, components: &IndexMap<String, Value>) -> Result<Value, SchemaError> {
    resolve_at(node, components, 0)
}

fn resolve_at(
    node: &Value,
    components: &IndexMap<String, Value>,
    depth: usize,
) -> Result<Value, SchemaError> {
    if depth > MAX_REF_DEPTH {
        return Err(SchemaError::RefDepthExceeded(MAX_REF_DEPTH));
    }

    let Some(obj) = node.as_object() else {
        return Ok(node.clone());
    };

    if let Some(reference) = obj.get("$ref").and_then(|r| r.as_str()) {
        return match ref_name(reference).and_then(|name| components.get(name)) {
            Some(target) => resolve_at(target, components, depth + 1),
            None => {
                tracing::debug!(reference, "Unresolvable $ref, treating as free-form");
                Ok(free_form())
            }
        };
    }

    let mut resolved = obj.clone();

    if let Some(properties) = obj.get("properties").and_then(|p| p.as_object()) {
        let mut out = Map::new();
        for (name, prop) in properties {
            out.insert(name.clone(), resolve_at(prop, components, depth + 1)?);
        }
        resolved.insert("properties".into(), Value::Object(out));
    }

    if let Some(items) = obj.get("items").filter(|i| i.is_object()) {
        resolved.insert("items".into(), resolve_at(items, components, depth + 1)?);
    }

    if let Some(additional) = obj.get("additionalProperties").filter(|a| a.is_object()) {
        resolved.insert(
            "additionalProperties".into(),
            resolve_at(additional, components, depth + 1)?,
        );
    }

    Ok(Value::Object(resolved))
}

fn free_form() -> Value {
    let mut obj = Map::new();
    obj.insert("type".into(), Value::String("object".into()));
    Value::Object(obj)
}

/// True when no `$ref` remains anywhere in the tree
pub fn is_fully_resolved(node: &Value) -> bool {
    match node {
        Value::Object(obj) => !obj.contains_key("$ref") && obj.values().all(is_fully_resolved),
        Value::Array(items) => items.iter().all(is_fully_resolved),
        _ => true,
    }
}
