//! Decoded OpenAPI document -> `ApiSchema`

use indexmap::IndexMap;
use serde_json::Value;

use crate::constants::{BODY_CONTENT_TYPES, DEFAULT_SCHEMA_TITLE, DEFAULT_SCHEMA_VERSION};
use crate::models::HttpMethod;
use crate::schema::model::{
    AdditionalProperties, ApiSchema, AuthKind, AuthRequirement, EndpointSchema, FieldDef,
    FieldKind, ParamLocation,
};
use crate::schema::refs::{self, SchemaError};

/// Build the schema model from a decoded document.
///
/// Never fails: a document without `paths` has no endpoints, and an operation
/// that cannot be read is skipped with a warning.
pub fn parse_document(doc: &Value, base_url: &str) -> ApiSchema {
    let info = doc.get("info");
    let title = info
        .and_then(|i| i.get("title"))
        .and_then(|v| v.as_str())
        .unwrap_or(DEFAULT_SCHEMA_TITLE)
        .to_string();
    let version = info
        .and_then(|i| i.get("version"))
        .and_then(value_as_text)
        .unwrap_or_else(|| DEFAULT_SCHEMA_VERSION.to_string());

    let components = object_entries(doc.get("components").and_then(|c| c.get("schemas")));
    let security_schemes =
        object_entries(doc.get("components").and_then(|c| c.get("securitySchemes")));
    let global_auth = doc.get("security").and_then(auth_from_security);

    let mut endpoints = Vec::new();

    if let Some(paths) = doc.get("paths").and_then(|p| p.as_object()) {
        for (path, item) in paths {
            let Some(methods) = item.as_object() else {
                tracing::debug!(path = %path, "Skipping non-object path item");
                continue;
            };

            // Shared by every operation under this path
            let shared_params = methods.get("parameters").and_then(|p| p.as_array());

            for (key, operation) in methods {
                // Skip non-HTTP method keys like "parameters"
                let Some(method) = HttpMethod::parse(key) else {
                    continue;
                };

                match parse_operation(method, path, operation, shared_params, &components, global_auth.as_ref()) {
                    Ok(endpoint) => endpoints.push(endpoint),
                    Err(err) => {
                        tracing::warn!(method = %method, path = %path, error = %err, "Skipping endpoint");
                    }
                }
            }
        }
    }

    tracing::info!(title = %title, endpoints = endpoints.len(), "Parsed API schema");

    ApiSchema {
        title,
        version,
        base_url: base_url.to_string(),
        endpoints,
        components,
        security_schemes,
    }
}

fn parse_operation(
    method: HttpMethod,
    path: &str,
    operation: &Value,
    shared_params: Option<&Vec<Value>>,
    components: &IndexMap<String, Value>,
    global_auth: Option<&AuthRequirement>,
) -> Result<EndpointSchema, SchemaError> {
    let op = operation
        .as_object()
        .ok_or_else(|| SchemaError::MalformedOperation {
            method: method.to_string(),
            path: path.to_string(),
        })?;

    let mut endpoint = EndpointSchema::new(method, path);

    endpoint.summary = op.get("summary").and_then(|v| v.as_str()).map(String::from);
    endpoint.description = op
        .get("description")
        .and_then(|v| v.as_str())
        .map(String::from);

    // Parameters
    let mut seen = Vec::new();
    if let Some(params) = op.get("parameters").and_then(|p| p.as_array()) {
        for param in params {
            if let Some(key) = add_parameter(&mut endpoint, param, components)? {
                seen.push(key);
            }
        }
    }

    // Also check path-level parameters, without overriding the operation's own
    if let Some(params) = shared_params {
        for param in params {
            let name = param.get("name").and_then(|n| n.as_str()).unwrap_or_default();
            let location = param.get("in").and_then(|i| i.as_str()).and_then(ParamLocation::parse);
            if seen.iter().any(|(n, l)| n == name && Some(*l) == location) {
                continue;
            }
            add_parameter(&mut endpoint, param, components)?;
        }
    }

    // Request body
    if let Some(body) = op.get("requestBody") {
        endpoint.body = parse_request_body(body, components)?;
    }

    // Security (operation-level overrides global)
    endpoint.auth = match op.get("security") {
        Some(security) => auth_from_security(security),
        None => global_auth.cloned(),
    };

    if let Some(responses) = op.get("responses").and_then(|r| r.as_object()) {
        endpoint.responses = responses
            .iter()
            .map(|(code, meta)| (code.clone(), meta.clone()))
            .collect();
    }

    Ok(endpoint)
}

/// Route one parameter into the endpoint; returns its name when it was readable
fn add_parameter(
    endpoint: &mut EndpointSchema,
    param: &Value,
    components: &IndexMap<String, Value>,
) -> Result<Option<(String, ParamLocation)>, SchemaError> {
    let Some(name) = param.get("name").and_then(|n| n.as_str()) else {
        tracing::debug!(path = %endpoint.path, "Skipping parameter without name");
        return Ok(None);
    };
    let Some(location) = param
        .get("in")
        .and_then(|i| i.as_str())
        .and_then(ParamLocation::parse)
    else {
        tracing::debug!(path = %endpoint.path, name, "Skipping parameter without location");
        return Ok(None);
    };

    let schema = match param.get("schema") {
        Some(node) => refs::resolve(node, components)?,
        None => Value::Object(Default::default()),
    };

    let mut field = field_from_schema(&schema, FieldKind::String);
    field.required = param
        .get("required")
        .and_then(|r| r.as_bool())
        .unwrap_or(false);
    if let Some(description) = param.get("description").and_then(|d| d.as_str()) {
        field.description = Some(description.to_string());
    }
    if let Some(example) = param.get("example") {
        field.example = Some(example.clone());
    }

    match location {
        ParamLocation::Header => {
            endpoint.headers.insert(name.to_string(), field);
        }
        ParamLocation::Query => {
            endpoint.query_params.insert(name.to_string(), field);
        }
        // Checked structurally against the path template
        ParamLocation::Path | ParamLocation::Cookie => {}
    }

    Ok(Some((name.to_string(), location)))
}

fn parse_request_body(
    body: &Value,
    components: &IndexMap<String, Value>,
) -> Result<Option<FieldDef>, SchemaError> {
    let Some(content) = body.get("content").and_then(|c| c.as_object()) else {
        return Ok(None);
    };

    // Preferred content types first
    let Some(media) = BODY_CONTENT_TYPES
        .iter()
        .find_map(|content_type| content.get(*content_type))
    else {
        return Ok(None);
    };

    let Some(node) = media.get("schema") else {
        return Ok(None);
    };

    let resolved = refs::resolve(node, components)?;
    let mut field = field_from_schema(&resolved, FieldKind::Object);
    field.required = body
        .get("required")
        .and_then(|r| r.as_bool())
        .unwrap_or(false);
    if field.example.is_none() {
        field.example = media.get("example").cloned();
    }

    Ok(Some(field))
}

/// First scheme of the first requirement; the inferred type is always bearer
fn auth_from_security(security: &Value) -> Option<AuthRequirement> {
    let scheme = security
        .as_array()?
        .first()?
        .as_object()?
        .keys()
        .next()?
        .clone();

    Some(AuthRequirement {
        scheme,
        auth_type: AuthKind::Bearer,
    })
}

/// Convert a resolved schema fragment into a field contract.
/// `fallback` is used when the fragment names no type and its shape gives no hint.
pub fn field_from_schema(node: &Value, fallback: FieldKind) -> FieldDef {
    let kind = declared_kind(node).unwrap_or_else(|| {
        if node.get("properties").is_some() {
            FieldKind::Object
        } else if node.get("items").is_some() {
            FieldKind::Array
        } else {
            fallback
        }
    });

    let mut field = FieldDef::new(kind);
    field.description = node
        .get("description")
        .and_then(|v| v.as_str())
        .map(String::from);
    field.default = node.get("default").cloned();
    field.example = node.get("example").cloned();
    field.pattern = node.get("pattern").and_then(|v| v.as_str()).map(String::from);
    field.min_length = node.get("minLength").and_then(|v| v.as_u64());
    field.max_length = node.get("maxLength").and_then(|v| v.as_u64());
    field.minimum = node.get("minimum").and_then(|v| v.as_f64());
    field.maximum = node.get("maximum").and_then(|v| v.as_f64());
    field.min_items = node.get("minItems").and_then(|v| v.as_u64());
    field.max_items = node.get("maxItems").and_then(|v| v.as_u64());

    if let Some(values) = node.get("enum").and_then(|e| e.as_array()) {
        for value in values {
            if kind.matches(value) {
                field.enum_values.push(value.clone());
            } else {
                tracing::debug!(kind = kind.as_str(), value = %value, "Dropping enum value of wrong type");
            }
        }
    }

    if let Some(required) = node.get("required").and_then(|r| r.as_array()) {
        field.required_props = required
            .iter()
            .filter_map(|r| r.as_str().map(String::from))
            .collect();
    }

    if let Some(properties) = node.get("properties").and_then(|p| p.as_object()) {
        for (name, prop) in properties {
            let mut child = field_from_schema(prop, FieldKind::String);
            child.required = field.required_props.contains(name);
            field.properties.insert(name.clone(), child);
        }
    }

    field.additional = match node.get("additionalProperties") {
        Some(Value::Bool(false)) => AdditionalProperties::Disallowed,
        Some(Value::Object(obj)) if !obj.is_empty() => AdditionalProperties::Schema(Box::new(
            field_from_schema(&Value::Object(obj.clone()), FieldKind::String),
        )),
        _ => AdditionalProperties::Allowed,
    };

    if let Some(items) = node.get("items").filter(|i| i.is_object()) {
        field.items = Some(Box::new(field_from_schema(items, FieldKind::String)));
    }

    field
}

/// `type` as a name, or the first non-null entry of a type list
fn declared_kind(node: &Value) -> Option<FieldKind> {
    match node.get("type")? {
        Value::String(name) => FieldKind::from_type_name(name),
        Value::Array(names) => names
            .iter()
            .filter_map(|n| n.as_str())
            .filter(|n| *n != "null")
            .find_map(FieldKind::from_type_name),
        _ => None,
    }
}

fn object_entries(node: Option<&Value>) -> IndexMap<String, Value> {
    node.and_then(|n| n.as_object())
        .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

/// YAML versions like `1.0` decode as numbers
fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::refs::is_fully_resolved;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn users_document() -> Value {
        json!({
            "openapi": "3.0.0",
            "info": {"title": "Users API", "version": "2.1.0"},
            "paths": {
                "/users": {
                    "get": {
                        "summary": "List users",
                        "parameters": [
                            {"name": "page", "in": "query", "schema": {"type": "integer", "default": 1}},
                            {"name": "X-Request-Id", "in": "header", "required": true, "schema": {"type": "string"}},
                            {"name": "session", "in": "cookie", "schema": {"type": "string"}},
                            {"in": "query", "schema": {"type": "string"}}
                        ],
                        "responses": {"200": {"description": "OK"}}
                    },
                    "post": {
                        "security": [{"bearerAuth": []}],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "multipart/form-data": {"schema": {"type": "string"}},
                                "application/json": {"schema": {"$ref": "#/components/schemas/User"}}
                            }
                        }
                    }
                },
                "/users/{id}": {
                    "parameters": [
                        {"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}},
                        {"name": "verbose", "in": "query", "schema": {"type": "boolean"}}
                    ],
                    "get": {
                        "parameters": [
                            {"name": "verbose", "in": "query", "description": "op level", "schema": {"type": "string"}}
                        ]
                    },
                    "delete": "not an operation",
                    "summary": "ignored"
                }
            },
            "components": {
                "schemas": {
                    "User": {
                        "type": "object",
                        "required": ["name"],
                        "properties": {
                            "name": {"type": "string", "minLength": 1},
                            "role": {"type": "string", "enum": ["admin", "user", 3]},
                            "address": {"$ref": "#/components/schemas/Address"}
                        }
                    },
                    "Address": {
                        "type": "object",
                        "properties": {"city": {"type": "string"}},
                        "additionalProperties": false
                    }
                },
                "securitySchemes": {"bearerAuth": {"type": "http", "scheme": "bearer"}}
            }
        })
    }

    #[test]
    fn test_missing_paths_gives_empty_schema() {
        let schema = parse_document(&json!({"openapi": "3.0.0"}), "http://localhost");
        assert_eq!(schema.title, "API");
        assert_eq!(schema.version, "1.0.0");
        assert_eq!(schema.base_url, "http://localhost");
        assert!(schema.endpoints.is_empty());
    }

    #[test]
    fn test_endpoints_keep_document_order_and_skip_malformed() {
        let schema = parse_document(&users_document(), "http://localhost");
        let listed: Vec<(HttpMethod, &str)> = schema
            .endpoints
            .iter()
            .map(|e| (e.method, e.path.as_str()))
            .collect();
        assert_eq!(
            listed,
            vec![
                (HttpMethod::GET, "/users"),
                (HttpMethod::POST, "/users"),
                (HttpMethod::GET, "/users/{id}"),
            ]
        );
        assert_eq!(schema.title, "Users API");
        assert_eq!(schema.version, "2.1.0");
        assert!(schema.security_schemes.contains_key("bearerAuth"));
    }

    #[test]
    fn test_parameters_are_routed_by_location() {
        let schema = parse_document(&users_document(), "");
        let list = &schema.endpoints[0];

        assert_eq!(list.query_params.len(), 1);
        assert_eq!(list.query_params["page"].kind, FieldKind::Integer);
        assert_eq!(list.query_params["page"].default, Some(json!(1)));
        assert!(list.headers["X-Request-Id"].required);
        assert_eq!(list.responses.len(), 1);
        assert!(list.auth.is_none());
    }

    #[test]
    fn test_operation_parameter_overrides_path_level() {
        let schema = parse_document(&users_document(), "");
        let get_one = &schema.endpoints[2];

        let verbose = &get_one.query_params["verbose"];
        assert_eq!(verbose.kind, FieldKind::String);
        assert_eq!(verbose.description.as_deref(), Some("op level"));
        assert!(get_one.headers.is_empty());
    }

    #[test]
    fn test_path_level_parameter_kept_when_location_differs() {
        let document = json!({
            "paths": {
                "/items": {
                    "parameters": [
                        {"name": "id", "in": "header", "schema": {"type": "string"}},
                        {"name": "id", "in": "query", "description": "shared"}
                    ],
                    "get": {
                        "parameters": [
                            {"name": "id", "in": "query", "description": "own", "schema": {"type": "integer"}}
                        ]
                    }
                }
            }
        });
        let schema = parse_document(&document, "");
        let endpoint = &schema.endpoints[0];

        assert!(endpoint.headers.contains_key("id"));
        assert_eq!(endpoint.query_params["id"].kind, FieldKind::Integer);
        assert_eq!(endpoint.query_params["id"].description.as_deref(), Some("own"));
    }

    #[test]
    fn test_body_resolves_refs_and_prefers_json() {
        let schema = parse_document(&users_document(), "");
        let create = &schema.endpoints[1];
        let body = create.body.as_ref().unwrap();

        assert!(body.required);
        assert_eq!(body.kind, FieldKind::Object);
        assert!(body.required_props.contains("name"));
        assert!(body.properties["name"].required);
        assert_eq!(body.properties["name"].min_length, Some(1));

        let address = &body.properties["address"];
        assert_eq!(address.kind, FieldKind::Object);
        assert_eq!(address.properties["city"].kind, FieldKind::String);
        assert_eq!(address.additional, AdditionalProperties::Disallowed);

        // 3 is not a string
        assert_eq!(body.properties["role"].enum_values, vec![json!("admin"), json!("user")]);

        assert_eq!(
            create.auth,
            Some(AuthRequirement {
                scheme: "bearerAuth".into(),
                auth_type: AuthKind::Bearer
            })
        );
    }

    #[test]
    fn test_nested_refs_fully_resolved_before_conversion() {
        let doc = users_document();
        let components = object_entries(doc["components"].get("schemas"));
        let resolved = refs::resolve(&json!({"$ref": "#/components/schemas/User"}), &components).unwrap();
        assert!(is_fully_resolved(&resolved));
    }

    #[test]
    fn test_self_referencing_body_skips_only_that_endpoint() {
        let doc = json!({
            "paths": {
                "/nodes": {
                    "post": {
                        "requestBody": {"content": {"application/json": {"schema": {"$ref": "#/components/schemas/Node"}}}}
                    },
                    "get": {}
                }
            },
            "components": {"schemas": {"Node": {
                "type": "object",
                "properties": {"child": {"$ref": "#/components/schemas/Node"}}
            }}}
        });

        let schema = parse_document(&doc, "");
        assert_eq!(schema.endpoints.len(), 1);
        assert_eq!(schema.endpoints[0].method, HttpMethod::GET);
    }

    #[test]
    fn test_global_security_applies_unless_overridden() {
        let doc = json!({
            "security": [{"apiKey": []}],
            "paths": {
                "/a": {"get": {}},
                "/b": {"get": {"security": []}}
            }
        });

        let schema = parse_document(&doc, "");
        assert_eq!(schema.endpoints[0].auth.as_ref().map(|a| a.scheme.as_str()), Some("apiKey"));
        assert!(schema.endpoints[1].auth.is_none());
    }

    #[test]
    fn test_field_kind_inference() {
        let nullable = field_from_schema(&json!({"type": ["null", "integer"]}), FieldKind::String);
        assert_eq!(nullable.kind, FieldKind::Integer);

        let shaped = field_from_schema(&json!({"items": {"type": "number"}}), FieldKind::String);
        assert_eq!(shaped.kind, FieldKind::Array);
        assert_eq!(shaped.items.as_ref().map(|i| i.kind), Some(FieldKind::Number));

        let untyped = field_from_schema(&json!({}), FieldKind::Object);
        assert!(untyped.is_free_form());

        let open = field_from_schema(
            &json!({"type": "object", "additionalProperties": {"type": "integer"}}),
            FieldKind::Object,
        );
        match open.additional {
            AdditionalProperties::Schema(field) => assert_eq!(field.kind, FieldKind::Integer),
            other => panic!("expected schema policy, got {:?}", other),
        }
    }
}
