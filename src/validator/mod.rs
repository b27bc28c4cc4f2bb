//! Checking an assembled request against an endpoint's schema

pub mod field;
pub mod path;
pub mod report;

use std::path::PathBuf;

use indexmap::IndexMap;
use serde_json::Value;

use crate::models::{Body, Request};
use crate::planner::descriptor::display_value;
use crate::schema::EndpointSchema;

pub use field::{coerce_param, validate_value};
pub use path::validate_path;
pub use report::{ValidationError, ValidationReport};

/// Body as supplied by the caller
#[derive(Clone, Debug, PartialEq)]
pub enum BodyPayload {
    Json(Value),
    /// Raw text, parsed as JSON before checking
    Text(String),
    /// File contents are not inspected
    File(PathBuf),
}

impl BodyPayload {
    fn is_empty(&self) -> bool {
        match self {
            BodyPayload::Json(value) => value.is_null(),
            BodyPayload::Text(text) => text.trim().is_empty(),
            BodyPayload::File(_) => false,
        }
    }
}

/// The parts of a request that are checked
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestParts {
    pub method: Option<String>,
    pub path: Option<String>,
    pub headers: IndexMap<String, String>,
    pub query: IndexMap<String, String>,
    pub body: Option<BodyPayload>,
}

impl RequestParts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn json_body(mut self, body: Value) -> Self {
        self.body = Some(BodyPayload::Json(body));
        self
    }

    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(BodyPayload::Text(body.into()));
        self
    }

    /// Parts of a stored request. Form fields are checked as a JSON object of strings.
    pub fn from_request(request: &Request) -> Self {
        let body = request.body.as_ref().map(|body| match body {
            Body::Json(value) => BodyPayload::Json(value.clone()),
            Body::Form(fields) => BodyPayload::Json(Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            )),
            Body::Raw(text) => BodyPayload::Text(text.clone()),
            Body::File(path) => BodyPayload::File(path.clone()),
        });

        RequestParts {
            method: Some(request.method.to_string()),
            path: Some(url_path(&request.url)),
            headers: request.headers.clone(),
            query: request.query.clone(),
            body,
        }
    }
}

/// Path component of a URL; `/` when it has none
pub fn url_path(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        return parsed.path().to_string();
    }
    // Templated hosts such as `{{base}}/users` do not parse
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let path = if url.starts_with('/') {
        url
    } else {
        without_scheme
            .find('/')
            .map(|i| &without_scheme[i..])
            .unwrap_or("/")
    };
    path.split(['?', '#']).next().unwrap_or("/").to_string()
}

/// Validate a request against an endpoint. Always returns a complete report.
pub fn validate_request(endpoint: &EndpointSchema, request: &RequestParts) -> ValidationReport {
    let mut report = ValidationReport::new();

    // Method
    if let Some(method) = &request.method {
        let method = method.trim().to_uppercase();
        if method != endpoint.method.as_str() {
            report.add_error("method", format!("Expected {}, got {}", endpoint.method, method), None);
        }
    }

    check_headers(endpoint, &request.headers, &mut report);
    check_query(endpoint, &request.query, &mut report);
    check_body(endpoint, request.body.as_ref(), &mut report);

    if let Some(path) = &request.path {
        validate_path(&endpoint.path, path, &mut report);
    }

    add_suggestions(endpoint, request, &mut report);

    report
}

fn check_headers(endpoint: &EndpointSchema, headers: &IndexMap<String, String>, report: &mut ValidationReport) {
    if endpoint.headers.is_empty() {
        return;
    }

    for (name, field) in &endpoint.headers {
        if field.required && !headers.keys().any(|h| h.eq_ignore_ascii_case(name)) {
            report.add_error(format!("headers.{}", name), "Required header is missing", None);
        }
    }

    for (name, raw) in headers {
        match endpoint.header(name) {
            Some((declared, field)) => {
                let value = coerce_param(raw, field.kind);
                validate_value(&format!("headers.{}", declared), &value, field, report);
            }
            None => report.add_warning(format!("Unexpected header: {}", name)),
        }
    }
}

fn check_query(endpoint: &EndpointSchema, query: &IndexMap<String, String>, report: &mut ValidationReport) {
    if endpoint.query_params.is_empty() {
        return;
    }

    for (name, field) in &endpoint.query_params {
        if field.required && !query.contains_key(name) {
            report.add_error(format!("query.{}", name), "Required query parameter is missing", None);
        }
    }

    for (name, raw) in query {
        match endpoint.query_params.get(name) {
            Some(field) => {
                let value = coerce_param(raw, field.kind);
                validate_value(&format!("query.{}", name), &value, field, report);
            }
            None => report.add_warning(format!("Unexpected query parameter: {}", name)),
        }
    }
}

fn check_body(endpoint: &EndpointSchema, body: Option<&BodyPayload>, report: &mut ValidationReport) {
    let body = body.filter(|b| !b.is_empty());

    let Some(schema) = &endpoint.body else {
        if body.is_some() {
            report.add_warning("Request body provided but not expected by schema");
        }
        return;
    };

    let value = match body {
        None => {
            if schema.required {
                report.add_error("body", "Request body is required", None);
            }
            return;
        }
        Some(BodyPayload::Json(value)) => value.clone(),
        Some(BodyPayload::File(path)) => {
            report.add_warning(format!("File body {} not checked against schema", path.display()));
            return;
        }
        Some(BodyPayload::Text(text)) => match serde_json::from_str::<Value>(text) {
            Ok(value) => value,
            Err(_) => {
                report.add_error("body", "Request body must be valid JSON", None);
                return;
            }
        },
    };

    validate_value("body", &value, schema, report);
}

fn add_suggestions(endpoint: &EndpointSchema, request: &RequestParts, report: &mut ValidationReport) {
    for (name, field) in &endpoint.headers {
        let Some(default) = field.default.as_ref().filter(|d| !d.is_null()) else {
            continue;
        };
        if !field.required && !request.headers.keys().any(|h| h.eq_ignore_ascii_case(name)) {
            report.add_suggestion(format!(
                "Consider adding header '{}' with default value: {}",
                name,
                display_value(default)
            ));
        }
    }

    for (name, field) in &endpoint.query_params {
        let Some(default) = field.default.as_ref().filter(|d| !d.is_null()) else {
            continue;
        };
        if !field.required && !request.query.contains_key(name) {
            report.add_suggestion(format!(
                "Consider adding query parameter '{}' with default value: {}",
                name,
                display_value(default)
            ));
        }
    }

    let has_body = request.body.as_ref().map(|b| !b.is_empty()).unwrap_or(false);
    if let Some(example) = endpoint.body.as_ref().and_then(|b| b.example.as_ref()) {
        if !has_body {
            let pretty = serde_json::to_string_pretty(example).unwrap_or_else(|_| example.to_string());
            report.add_suggestion(format!("Example request body: {}", pretty));
        }
    }
}
