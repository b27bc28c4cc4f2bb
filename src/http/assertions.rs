//! Response assertions for saved requests

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::models::ResponseData;

/// Expectations on a response. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Assertions {
    pub status_code: Option<u16>,
    pub body_contains: Option<String>,
    /// Compared after trimming both sides
    pub body_equals: Option<String>,
    /// Dotted path into the JSON body (`user.name`, `items.0.id`) to expected value
    pub json_field: IndexMap<String, Value>,
    /// Seconds
    pub max_response_time: Option<f64>,
    /// Header name (any case) to exact value
    pub headers: IndexMap<String, String>,
}

/// Outcome of one assertion
#[derive(Clone, Debug, PartialEq)]
pub struct AssertionResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Default, Deserialize)]
struct TestsFile {
    #[serde(default)]
    tests: IndexMap<String, Assertions>,
}

impl Assertions {
    /// The check used when no tests file is given
    pub fn expect_ok() -> Self {
        Assertions {
            status_code: Some(200),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Assertions::default()
    }

    /// Run every assertion against a response, in declaration order
    pub fn check(&self, response: &ResponseData) -> Vec<AssertionResult> {
        let mut results = Vec::new();

        if let Some(expected) = self.status_code {
            results.push(AssertionResult {
                name: "status_code".into(),
                passed: response.status == expected,
                detail: format!("expected {}, got {}", expected, response.status),
            });
        }

        if let Some(text) = &self.body_contains {
            results.push(AssertionResult {
                name: "body_contains".into(),
                passed: response.body.contains(text.as_str()),
                detail: format!("looking for {:?}", text),
            });
        }

        if let Some(expected) = &self.body_equals {
            results.push(AssertionResult {
                name: "body_equals".into(),
                passed: response.body.trim() == expected.trim(),
                detail: format!("{} bytes received", response.body.len()),
            });
        }

        for (path, expected) in &self.json_field {
            let actual = response.json.as_ref().and_then(|json| json_at(json, path));
            results.push(AssertionResult {
                name: format!("json_field.{}", path),
                passed: actual == Some(expected),
                detail: match actual {
                    Some(actual) => format!("expected {}, got {}", expected, actual),
                    None => format!("expected {}, field missing", expected),
                },
            });
        }

        if let Some(max) = self.max_response_time {
            let seconds = response.elapsed_ms as f64 / 1000.0;
            results.push(AssertionResult {
                name: "max_response_time".into(),
                passed: seconds <= max,
                detail: format!("{:.3}s (limit {}s)", seconds, max),
            });
        }

        for (name, expected) in &self.headers {
            let actual = response
                .headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
                .unwrap_or_default();
            results.push(AssertionResult {
                name: format!("headers.{}", name),
                passed: actual == expected,
                detail: format!("expected {:?}, got {:?}", expected, actual),
            });
        }

        results
    }
}

/// Walk a dotted path; numeric segments index arrays
fn json_at<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, part| match current {
        Value::Object(map) => map.get(part),
        Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Assertions for request `name` from a tests file (`tests: {<name>: {...}}`).
/// YAML by `.yaml`/`.yml` extension, otherwise JSON.
pub fn load_assertions(path: &Path, name: &str) -> Result<Option<Assertions>> {
    let content = fs::read_to_string(path).with_context(|| format!("Tests file not found: {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let mut file: TestsFile = if is_yaml {
        serde_yaml::from_str(&content).with_context(|| format!("Invalid tests file {}", path.display()))?
    } else {
        serde_json::from_str(&content).with_context(|| format!("Invalid tests file {}", path.display()))?
    };

    Ok(file.tests.shift_remove(name).filter(|a| !a.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HttpMethod;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn response() -> ResponseData {
        ResponseData {
            method: HttpMethod::GET,
            url: "http://localhost/users/1".into(),
            status: 200,
            headers: vec![("content-type".into(), "application/json".into())],
            body: r#"{"user": {"name": "ada", "tags": ["x", "y"]}}"#.into(),
            json: Some(json!({"user": {"name": "ada", "tags": ["x", "y"]}})),
            elapsed_ms: 120,
        }
    }

    fn failed(results: &[AssertionResult]) -> Vec<&str> {
        results.iter().filter(|r| !r.passed).map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_all_assertions_pass() {
        let mut assertions = Assertions::expect_ok();
        assertions.body_contains = Some("ada".into());
        assertions.json_field.insert("user.name".into(), json!("ada"));
        assertions.json_field.insert("user.tags.1".into(), json!("y"));
        assertions.max_response_time = Some(0.5);
        assertions.headers.insert("Content-Type".into(), "application/json".into());

        let results = assertions.check(&response());
        assert_eq!(results.len(), 6);
        assert_eq!(failed(&results), Vec::<&str>::new());
    }

    #[test]
    fn test_failures_are_named() {
        let mut assertions = Assertions {
            status_code: Some(201),
            body_equals: Some("{}".into()),
            max_response_time: Some(0.1),
            ..Default::default()
        };
        assertions.json_field.insert("user.email".into(), json!("a@b"));
        assertions.headers.insert("X-Missing".into(), "1".into());

        let results = assertions.check(&response());
        assert_eq!(
            failed(&results),
            vec![
                "status_code",
                "body_equals",
                "json_field.user.email",
                "max_response_time",
                "headers.X-Missing"
            ]
        );
        assert_eq!(results[0].detail, "expected 201, got 200");
    }

    #[test]
    fn test_load_assertions_from_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("tests.yaml");
        fs::write(&yaml, "tests:\n  ping:\n    status_code: 204\n    body_contains: pong\n").unwrap();
        let ping = load_assertions(&yaml, "ping").unwrap().unwrap();
        assert_eq!(ping.status_code, Some(204));
        assert_eq!(ping.body_contains.as_deref(), Some("pong"));
        assert_eq!(load_assertions(&yaml, "other").unwrap(), None);

        let json_path = dir.path().join("tests.json");
        fs::write(&json_path, r#"{"tests": {"ping": {"json_field": {"ok": true}}}}"#).unwrap();
        let ping = load_assertions(&json_path, "ping").unwrap().unwrap();
        assert_eq!(ping.json_field["ok"], json!(true));

        assert!(load_assertions(&dir.path().join("missing.yaml"), "ping").is_err());
    }
}
