use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::AuthConfig;

/// HTTP Method enum
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
    HEAD,
    OPTIONS,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::GET,
        HttpMethod::POST,
        HttpMethod::PUT,
        HttpMethod::PATCH,
        HttpMethod::DELETE,
        HttpMethod::HEAD,
        HttpMethod::OPTIONS,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }

    /// Case-insensitive lookup; `None` for anything outside the fixed set
    pub fn parse(s: &str) -> Option<HttpMethod> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
    }

    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::POST | HttpMethod::PUT | HttpMethod::PATCH)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        HttpMethod::parse(s).ok_or_else(|| anyhow!("Unknown HTTP method: {}", s))
    }
}

/// Request body
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Body {
    Json(Value),
    Form(IndexMap<String, String>),
    Raw(String),
    /// File sent as-is, read when the request goes out
    File(PathBuf),
}

impl Body {
    /// Build a body from the mutually exclusive `--json`, `--form` and `--raw` flags.
    /// A `--json` value that does not parse is kept as a raw body.
    pub fn from_flags(json: Option<&str>, form: &[String], raw: Option<&str>) -> Result<Option<Body>> {
        if let Some(text) = json {
            return Ok(Some(match serde_json::from_str::<Value>(text) {
                Ok(value) => Body::Json(value),
                Err(_) => Body::Raw(text.to_string()),
            }));
        }

        if !form.is_empty() {
            let mut fields = IndexMap::new();
            for pair in form {
                let (key, value) = split_pair(pair, '=')?;
                fields.insert(key, value);
            }
            return Ok(Some(Body::Form(fields)));
        }

        Ok(raw.map(|text| Body::Raw(text.to_string())))
    }

    /// Content-Type implied by the body kind
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Body::Json(_) => Some("application/json"),
            Body::Form(_) => Some("application/x-www-form-urlencoded"),
            Body::Raw(_) => None,
            Body::File(path) => Some(content_type_for_path(path)),
        }
    }

    /// Body as it would be written on the wire
    pub fn to_text(&self) -> String {
        match self {
            Body::Json(value) => value.to_string(),
            Body::Form(fields) => fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&"),
            Body::Raw(text) => text.clone(),
            Body::File(path) => format!("@{}", path.display()),
        }
    }
}

/// Content-Type guessed from a file extension
pub fn content_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "json" => "application/json",
        "xml" => "application/xml",
        "html" | "htm" => "text/html",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "gz" => "application/gzip",
        _ => "application/octet-stream",
    }
}

/// Parse `Key: Value` header arguments
pub fn parse_header_arg(arg: &str) -> Result<(String, String)> {
    split_pair(arg, ':').map_err(|_| anyhow!("Invalid header format: {}. Use 'Key: Value'", arg))
}

/// Parse `key=value` query arguments
pub fn parse_query_arg(arg: &str) -> Result<(String, String)> {
    split_pair(arg, '=').map_err(|_| anyhow!("Invalid query format: {}. Use 'key=value'", arg))
}

fn split_pair(s: &str, sep: char) -> Result<(String, String)> {
    match s.split_once(sep) {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => bail!("expected '{}' separated pair: {}", sep, s),
    }
}

/// A single HTTP request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: HttpMethod,
    pub url: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub query: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    #[serde(default, skip_serializing_if = "AuthConfig::is_none")]
    pub auth: AuthConfig,
}

impl Request {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Request {
            method,
            url: url.into(),
            headers: IndexMap::new(),
            query: IndexMap::new(),
            body: None,
            auth: AuthConfig::None,
        }
    }

    /// Attach a body and its implied Content-Type unless one was set explicitly
    pub fn with_body(mut self, body: Body) -> Self {
        if let Some(content_type) = body.content_type() {
            let has_content_type = self
                .headers
                .keys()
                .any(|k| k.eq_ignore_ascii_case("content-type"));
            if !has_content_type {
                self.headers.insert("Content-Type".into(), content_type.into());
            }
        }
        self.body = Some(body);
        self
    }

    /// URL with the query parameters appended
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        if let Ok(mut url) = reqwest::Url::parse(&self.url) {
            url.query_pairs_mut()
                .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            return url.to_string();
        }
        let separator = if self.url.contains('?') { '&' } else { '?' };
        let pairs: Vec<String> = self.query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        format!("{}{}{}", self.url, separator, pairs.join("&"))
    }

    /// Copy with `{{variable}}` references resolved against an environment
    pub fn resolved(&self, environment: Option<&Environment>) -> Request {
        let Some(env) = environment else {
            return self.clone();
        };
        let substitute_map = |map: &IndexMap<String, String>| {
            map.iter()
                .map(|(k, v)| (k.clone(), env.substitute(v)))
                .collect::<IndexMap<_, _>>()
        };
        Request {
            method: self.method,
            url: env.substitute(&self.url),
            headers: substitute_map(&self.headers),
            query: substitute_map(&self.query),
            body: self.body.as_ref().map(|body| match body {
                Body::Json(value) => Body::Json(value.clone()),
                Body::Form(fields) => Body::Form(substitute_map(fields)),
                Body::Raw(text) => Body::Raw(env.substitute(text)),
                Body::File(path) => Body::File(path.clone()),
            }),
            auth: match &self.auth {
                AuthConfig::Bearer { token } => AuthConfig::Bearer {
                    token: env.substitute(token),
                },
                other => other.clone(),
            },
        }
    }
}

/// A collection of named requests
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// Key in `collections.yaml`
    #[serde(skip)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub requests: IndexMap<String, Request>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Collection {
            name: name.into(),
            description: None,
            requests: IndexMap::new(),
        }
    }
}

/// Environment variables
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    /// Key in `envs.yaml`
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub variables: IndexMap<String, String>,
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Environment {
            name: name.into(),
            variables: IndexMap::new(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.variables.get(key)
    }

    /// Substitutes {{variable}} patterns in text
    pub fn substitute(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (key, value) in &self.variables {
            let pattern = format!("{{{{{}}}}}", key);
            result = result.replace(&pattern, value);
        }
        result
    }
}

/// Response from HTTP request
#[derive(Clone, Debug)]
pub struct ResponseData {
    pub method: HttpMethod,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Parsed body when it is JSON
    pub json: Option<Value>,
    pub elapsed_ms: u64,
}

impl ResponseData {
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.as_str())
    }

    /// Body pretty-printed when it is JSON
    pub fn display_body(&self) -> String {
        match &self.json {
            Some(json) => serde_json::to_string_pretty(json).unwrap_or_else(|_| self.body.clone()),
            None => self.body.clone(),
        }
    }
}

/// History entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub elapsed_ms: Option<u64>,
    pub success: bool,
}

impl HistoryEntry {
    pub fn from_response(response: &ResponseData) -> Self {
        HistoryEntry {
            timestamp: chrono::Utc::now(),
            method: response.method,
            url: response.url.clone(),
            status: Some(response.status),
            elapsed_ms: Some(response.elapsed_ms),
            success: response.is_success(),
        }
    }

    pub fn failed(request: &Request) -> Self {
        HistoryEntry {
            timestamp: chrono::Utc::now(),
            method: request.method,
            url: request.full_url(),
            status: None,
            elapsed_ms: None,
            success: false,
        }
    }
}
