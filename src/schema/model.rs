//! Typed model of an API surface: endpoints and the field contracts they declare

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::models::HttpMethod;

/// Declared type of a field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl FieldKind {
    /// Map a JSON-Schema `type` name; unknown names yield `None`
    pub fn from_type_name(name: &str) -> Option<FieldKind> {
        match name {
            "string" => Some(FieldKind::String),
            "integer" => Some(FieldKind::Integer),
            "number" => Some(FieldKind::Number),
            "boolean" => Some(FieldKind::Boolean),
            "object" => Some(FieldKind::Object),
            "array" => Some(FieldKind::Array),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Object => "object",
            FieldKind::Array => "array",
        }
    }

    /// Whether a JSON value has this kind at runtime.
    /// `integer` accepts whole numbers only, `number` accepts any number.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Integer => is_whole_number(value),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Object => value.is_object(),
            FieldKind::Array => value.is_array(),
        }
    }
}

fn is_whole_number(value: &Value) -> bool {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => true,
        Value::Number(n) => n.as_f64().map(|f| f.is_finite() && f.fract() == 0.0).unwrap_or(false),
        _ => false,
    }
}

/// Name used in messages for the runtime kind of a value
pub fn value_kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) if is_whole_number(value) => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Policy for object keys that are not declared as properties
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub enum AdditionalProperties {
    #[default]
    Allowed,
    Disallowed,
    Schema(Box<FieldDef>),
}

/// Contract for one value: its kind, constraints and nested structure
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldDef {
    pub kind: FieldKind,
    pub required: bool,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub enum_values: Vec<Value>,
    pub pattern: Option<String>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub example: Option<Value>,
    pub properties: IndexMap<String, FieldDef>,
    pub required_props: BTreeSet<String>,
    pub additional: AdditionalProperties,
    pub items: Option<Box<FieldDef>>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
}

impl FieldDef {
    pub fn new(kind: FieldKind) -> Self {
        FieldDef {
            kind,
            required: false,
            description: None,
            default: None,
            enum_values: Vec::new(),
            pattern: None,
            min_length: None,
            max_length: None,
            minimum: None,
            maximum: None,
            example: None,
            properties: IndexMap::new(),
            required_props: BTreeSet::new(),
            additional: AdditionalProperties::Allowed,
            items: None,
            min_items: None,
            max_items: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Add a property; a required child is also recorded in `required_props`
    pub fn property(mut self, name: impl Into<String>, field: FieldDef) -> Self {
        let name = name.into();
        if field.required {
            self.required_props.insert(name.clone());
        }
        self.properties.insert(name, field);
        self
    }

    pub fn items(mut self, item: FieldDef) -> Self {
        self.items = Some(Box::new(item));
        self
    }

    /// An object without declared properties accepts any keys
    pub fn is_free_form(&self) -> bool {
        self.kind == FieldKind::Object && self.properties.is_empty()
    }

    pub fn has_enum(&self) -> bool {
        !self.enum_values.is_empty()
    }
}

/// Inferred credential type of an auth requirement
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthKind {
    #[default]
    Bearer,
    Basic,
    ApiKey,
}

impl AuthKind {
    pub fn as_str(&self) -> &str {
        match self {
            AuthKind::Bearer => "bearer",
            AuthKind::Basic => "basic",
            AuthKind::ApiKey => "apikey",
        }
    }
}

/// Security scheme an endpoint asks for
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuthRequirement {
    pub scheme: String,
    pub auth_type: AuthKind,
}

/// Where a parameter is carried
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Header,
    Query,
    Path,
    Cookie,
}

impl ParamLocation {
    pub fn parse(s: &str) -> Option<ParamLocation> {
        match s {
            "header" => Some(ParamLocation::Header),
            "query" => Some(ParamLocation::Query),
            "path" => Some(ParamLocation::Path),
            "cookie" => Some(ParamLocation::Cookie),
            _ => None,
        }
    }
}

/// One method + path template and what it accepts
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EndpointSchema {
    pub method: HttpMethod,
    pub path: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub headers: IndexMap<String, FieldDef>,
    pub query_params: IndexMap<String, FieldDef>,
    pub body: Option<FieldDef>,
    pub auth: Option<AuthRequirement>,
    pub responses: IndexMap<String, Value>,
}

impl EndpointSchema {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        EndpointSchema {
            method,
            path,
            summary: None,
            description: None,
            headers: IndexMap::new(),
            query_params: IndexMap::new(),
            body: None,
            auth: None,
            responses: IndexMap::new(),
        }
    }

    /// Header definition, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<(&String, &FieldDef)> {
        self.headers
            .iter()
            .find(|(declared, _)| declared.eq_ignore_ascii_case(name))
    }

    /// Names of the `{placeholder}` segments in the path template
    pub fn path_params(&self) -> Vec<&str> {
        self.path
            .split('/')
            .filter_map(placeholder_name)
            .collect()
    }
}

/// `{name}` -> `Some("name")`
pub fn placeholder_name(segment: &str) -> Option<&str> {
    segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
}

/// A loaded API description
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ApiSchema {
    pub title: String,
    pub version: String,
    pub base_url: String,
    pub endpoints: Vec<EndpointSchema>,
    /// Raw `components.schemas` fragments
    pub components: IndexMap<String, Value>,
    pub security_schemes: IndexMap<String, Value>,
}

/// Overview of a schema for listings
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SchemaSummary {
    pub title: String,
    pub version: String,
    pub base_url: String,
    pub total_endpoints: usize,
    pub methods: Vec<HttpMethod>,
    pub has_auth: bool,
}

impl ApiSchema {
    /// Endpoint for a method and a concrete or template path
    pub fn find_endpoint(&self, method: HttpMethod, path: &str) -> Option<&EndpointSchema> {
        self.endpoints
            .iter()
            .find(|e| e.method == method && e.path == path)
            .or_else(|| {
                self.endpoints
                    .iter()
                    .find(|e| e.method == method && path_matches(&e.path, path))
            })
    }

    /// `(method, path)` pairs sorted by path then method, optionally for one method
    pub fn list_endpoints(&self, method: Option<HttpMethod>) -> Vec<(HttpMethod, String)> {
        let mut list: Vec<(HttpMethod, String)> = self
            .endpoints
            .iter()
            .filter(|e| method.map(|m| e.method == m).unwrap_or(true))
            .map(|e| (e.method, e.path.clone()))
            .collect();
        list.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
        list
    }

    pub fn summary(&self) -> SchemaSummary {
        let methods: BTreeSet<HttpMethod> = self.endpoints.iter().map(|e| e.method).collect();
        SchemaSummary {
            title: self.title.clone(),
            version: self.version.clone(),
            base_url: self.base_url.clone(),
            total_endpoints: self.endpoints.len(),
            methods: methods.into_iter().collect(),
            has_auth: self.endpoints.iter().any(|e| e.auth.is_some()),
        }
    }
}

/// Whether a concrete path fits a template: equal segment counts, literal
/// segments equal, `{name}` segments non-empty. Only the leading `/` is ignored,
/// so a trailing slash counts as an (empty) extra segment.
pub fn path_matches(template: &str, actual: &str) -> bool {
    let template_parts = split_path(template);
    let actual_parts = split_path(actual);

    template_parts.len() == actual_parts.len()
        && template_parts
            .iter()
            .zip(&actual_parts)
            .all(|(t, a)| match placeholder_name(t) {
                Some(_) => !a.is_empty(),
                None => t == a,
            })
}

/// Whether `pattern` matches the whole of `value`
pub fn full_match(pattern: &str, value: &str) -> Result<bool, regex::Error> {
    let anchored = regex::Regex::new(&format!("^(?:{})$", pattern))?;
    Ok(anchored.is_match(value))
}

/// Path segments after the leading `/`
pub fn split_path(path: &str) -> Vec<&str> {
    path.strip_prefix('/').unwrap_or(path).split('/').collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_matches_runtime_values() {
        assert!(FieldKind::Integer.matches(&json!(3)));
        assert!(FieldKind::Integer.matches(&json!(3.0)));
        assert!(!FieldKind::Integer.matches(&json!(3.5)));
        assert!(FieldKind::Number.matches(&json!(3)));
        assert!(!FieldKind::String.matches(&json!(3)));
        assert!(FieldKind::Object.matches(&json!({})));
        assert!(!FieldKind::Boolean.matches(&json!("true")));
    }

    #[test]
    fn test_path_matches() {
        assert!(path_matches("/users/{id}", "/users/42"));
        assert!(path_matches("/users", "/users"));
        assert!(!path_matches("/users/{id}", "/users"));
        assert!(!path_matches("/users/{id}", "/users/"));
        assert!(!path_matches("/users/{id}/posts", "/users/1/comments"));
    }

    #[test]
    fn test_find_and_list_endpoints() {
        let schema = ApiSchema {
            title: "T".into(),
            version: "1".into(),
            base_url: "http://localhost".into(),
            endpoints: vec![
                EndpointSchema::new(HttpMethod::POST, "/users"),
                EndpointSchema::new(HttpMethod::GET, "/users/{id}"),
                EndpointSchema::new(HttpMethod::GET, "/users"),
            ],
            components: IndexMap::new(),
            security_schemes: IndexMap::new(),
        };

        let found = schema.find_endpoint(HttpMethod::GET, "/users/7").unwrap();
        assert_eq!(found.path, "/users/{id}");
        assert!(schema.find_endpoint(HttpMethod::DELETE, "/users").is_none());

        let listed = schema.list_endpoints(None);
        assert_eq!(
            listed,
            vec![
                (HttpMethod::GET, "/users".to_string()),
                (HttpMethod::POST, "/users".to_string()),
                (HttpMethod::GET, "/users/{id}".to_string()),
            ]
        );
        assert_eq!(schema.list_endpoints(Some(HttpMethod::POST)).len(), 1);

        let summary = schema.summary();
        assert_eq!(summary.total_endpoints, 3);
        assert_eq!(summary.methods, vec![HttpMethod::GET, HttpMethod::POST]);
        assert!(!summary.has_auth);
    }

    #[test]
    fn test_endpoint_path_normalized() {
        let endpoint = EndpointSchema::new(HttpMethod::GET, "items/{item_id}");
        assert_eq!(endpoint.path, "/items/{item_id}");
        assert_eq!(endpoint.path_params(), vec!["item_id"]);
    }
}
