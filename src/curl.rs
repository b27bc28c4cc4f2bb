//! cURL export and import

use anyhow::{anyhow, bail, Result};
use base64::Engine;
use indexmap::IndexMap;

use crate::auth::AuthConfig;
use crate::models::{parse_header_arg, Body, HttpMethod, Request};

/// Parse a cURL command into a Request
pub fn parse_curl(input: &str) -> Result<Request> {
    // Remove line continuations and normalize
    let normalized = input.replace("\\\r\n", " ").replace("\\\n", " ");

    let mut tokens = tokenize(&normalized)?;

    // Skip 'curl' command if present
    if tokens.first().map(|s| s.as_str()) == Some("curl") {
        tokens.remove(0);
    }

    let mut method: Option<HttpMethod> = None;
    let mut url: Option<String> = None;
    let mut headers: IndexMap<String, String> = IndexMap::new();
    let mut auth = AuthConfig::None;
    let mut data: Vec<String> = Vec::new();
    let mut form: IndexMap<String, String> = IndexMap::new();
    let mut data_as_query = false;

    let mut iter = tokens.into_iter();
    while let Some(token) = iter.next() {
        match token.as_str() {
            "-X" | "--request" => {
                let value = iter.next().ok_or_else(|| anyhow!("{} needs a value", token))?;
                method = Some(value.parse()?);
            }
            "-H" | "--header" => {
                let value = iter.next().ok_or_else(|| anyhow!("{} needs a value", token))?;
                let (key, value) = parse_header_arg(&value)?;
                // Check for Bearer token in Authorization header
                if key.eq_ignore_ascii_case("authorization") {
                    if let Some(token) = strip_prefix_ignore_case(&value, "bearer ") {
                        auth = AuthConfig::Bearer { token: token.to_string() };
                        continue;
                    }
                    if let Some((username, password)) = decode_basic(&value) {
                        auth = AuthConfig::Basic { username, password };
                        continue;
                    }
                }
                // Don't add duplicate headers
                if !headers.keys().any(|k| k.eq_ignore_ascii_case(&key)) {
                    headers.insert(key, value);
                }
            }
            "-d" | "--data" | "--data-raw" | "--data-binary" | "--data-ascii" => {
                let value = iter.next().ok_or_else(|| anyhow!("{} needs a value", token))?;
                data.push(value);
            }
            "--data-urlencode" => {
                let value = iter.next().ok_or_else(|| anyhow!("{} needs a value", token))?;
                let (key, value) = value.split_once('=').unwrap_or((value.as_str(), ""));
                form.insert(key.to_string(), value.to_string());
            }
            "-u" | "--user" => {
                let value = iter.next().ok_or_else(|| anyhow!("{} needs a value", token))?;
                let (username, password) = value.split_once(':').unwrap_or((value.as_str(), ""));
                auth = AuthConfig::Basic {
                    username: username.to_string(),
                    password: password.to_string(),
                };
            }
            "-G" | "--get" => data_as_query = true,
            "--url" => {
                url = iter.next();
            }
            "--compressed" | "-k" | "--insecure" | "-L" | "--location" | "-s" | "--silent" | "-v"
            | "--verbose" | "-i" | "--include" => {
                // Ignored flags
            }
            other if other.starts_with('-') => {
                tracing::debug!(flag = other, "Ignoring unsupported cURL flag");
            }
            _ => {
                if url.is_none() {
                    url = Some(token);
                }
            }
        }
    }

    let url = url.ok_or_else(|| anyhow!("No URL found in cURL command"))?;
    let (base, mut query) = split_query(&url);

    // A lone `@path` data argument sends that file
    let file = match data.as_slice() {
        [single] => single.strip_prefix('@').filter(|p| !p.is_empty()),
        _ => None,
    };

    let mut body = None;
    if data_as_query {
        for chunk in &data {
            for pair in chunk.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                query.insert(key.to_string(), value.to_string());
            }
        }
        query.extend(form.drain(..));
    } else if !form.is_empty() {
        body = Some(Body::Form(form));
    } else if let Some(path) = file {
        body = Some(Body::File(path.into()));
    } else if !data.is_empty() {
        let text = data.join("&");
        body = Some(match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(value) if looks_like_json(&headers) || value.is_object() || value.is_array() => {
                Body::Json(value)
            }
            _ => Body::Raw(text),
        });
    }

    // Infer POST when data is sent without an explicit method
    let method = method.unwrap_or(if body.is_some() { HttpMethod::POST } else { HttpMethod::GET });

    Ok(Request {
        method,
        url: base,
        headers,
        query,
        body,
        auth,
    })
}

fn looks_like_json(headers: &IndexMap<String, String>) -> bool {
    headers
        .iter()
        .any(|(k, v)| k.eq_ignore_ascii_case("content-type") && v.contains("json"))
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    if value.len() >= prefix.len() && value[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(value[prefix.len()..].trim())
    } else {
        None
    }
}

/// Separate `?a=1&b=2` from a URL
fn split_query(url: &str) -> (String, IndexMap<String, String>) {
    let mut query = IndexMap::new();
    let Some((base, qs)) = url.split_once('?') else {
        return (url.to_string(), query);
    };
    for pair in qs.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        query.insert(key.to_string(), value.to_string());
    }
    (base.to_string(), query)
}

/// Tokenize a curl command, respecting quotes
fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;

    for c in input.chars() {
        if escape_next {
            current.push(c);
            escape_next = false;
            continue;
        }

        match c {
            '\\' if !in_single_quote => {
                escape_next = true;
                in_token = true;
            }
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                in_token = true;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                in_token = true;
            }
            ' ' | '\t' | '\n' | '\r' if !in_single_quote && !in_double_quote => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            _ => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_single_quote || in_double_quote {
        bail!("Unterminated quote in cURL command");
    }
    if in_token {
        tokens.push(current);
    }

    Ok(tokens)
}

/// Single-quote for a POSIX shell
fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "'\\''"))
}

/// Format request as cURL command
pub fn to_curl(request: &Request) -> String {
    let mut parts = vec!["curl".to_string()];

    // Method
    if request.method != HttpMethod::GET {
        parts.push(format!("-X {}", request.method.as_str()));
    }

    let mut headers = request.headers.clone();
    let mut query = request.query.clone();

    // Auth
    match &request.auth {
        AuthConfig::Basic { username, password } => {
            parts.push(format!("-u {}", quote(&format!("{}:{}", username, password))));
        }
        AuthConfig::None => {}
        // Bearer and API keys land in headers or query
        _ => request.auth.apply(&mut headers, &mut query),
    }

    // URL
    let url = Request {
        query,
        ..Request::new(request.method, request.url.clone())
    }
    .full_url();
    parts.push(quote(&url));

    // Headers
    for (key, value) in &headers {
        parts.push(format!("-H {}", quote(&format!("{}: {}", key, value))));
    }

    // Body
    match &request.body {
        Some(body @ Body::File(_)) => parts.push(format!("--data-binary {}", quote(&body.to_text()))),
        Some(body) => {
            let text = body.to_text();
            if !text.is_empty() {
                parts.push(format!("-d {}", quote(&text)));
            }
        }
        None => {}
    }

    parts.join(" \\\n  ")
}

/// Credentials from a `Basic <base64>` Authorization value
fn decode_basic(value: &str) -> Option<(String, String)> {
    let encoded = strip_prefix_ignore_case(value, "basic ")?;
    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    let (user, pass) = text.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_simple_get() {
        let curl = "curl https://api.example.com/users";
        let req = parse_curl(curl).unwrap();
        assert_eq!(req.url, "https://api.example.com/users");
        assert_eq!(req.method, HttpMethod::GET);
    }

    #[test]
    fn test_parse_post_with_data() {
        let curl = r#"curl -X POST -H "Content-Type: application/json" -d '{"name":"test"}' https://api.example.com/users"#;
        let req = parse_curl(curl).unwrap();
        assert_eq!(req.method, HttpMethod::POST);
        assert_eq!(req.body, Some(Body::Json(json!({"name": "test"}))));
        assert_eq!(req.headers["Content-Type"], "application/json");
    }

    #[test]
    fn test_parse_auth_query_and_continuations() {
        let curl = "curl 'https://api.example.com/search?q=rust&page=2' \\\n  -H 'Authorization: Bearer abc123' \\\n  -u admin:s3:cret";
        let req = parse_curl(curl).unwrap();
        assert_eq!(req.url, "https://api.example.com/search");
        assert_eq!(req.query["q"], "rust");
        assert_eq!(req.query["page"], "2");
        assert!(req.headers.is_empty());
        // -u comes last and wins
        assert_eq!(
            req.auth,
            AuthConfig::Basic {
                username: "admin".into(),
                password: "s3:cret".into()
            }
        );
    }

    #[test]
    fn test_data_infers_post_and_get_flag_moves_to_query() {
        let req = parse_curl("curl -d 'a=1&b=2' http://localhost/form").unwrap();
        assert_eq!(req.method, HttpMethod::POST);
        assert_eq!(req.body, Some(Body::Raw("a=1&b=2".into())));

        let req = parse_curl("curl -G -d 'a=1' --data-urlencode 'b=x y' http://localhost/find").unwrap();
        assert_eq!(req.method, HttpMethod::GET);
        assert_eq!(req.body, None);
        assert_eq!(req.query.len(), 2);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_curl("curl -H 'X-A: 1'").is_err());
        assert!(parse_curl("curl 'http://unterminated").is_err());
        assert!(parse_curl("curl -X TRACE http://localhost").is_err());
    }

    #[test]
    fn test_to_curl_quotes_and_auth() {
        let mut request = Request::new(HttpMethod::POST, "https://api.example.com/notes")
            .with_body(Body::Json(json!({"text": "it's"})));
        request.query.insert("draft".into(), "true".into());
        request.auth = AuthConfig::Bearer { token: "tok".into() };

        let curl = to_curl(&request);
        assert_eq!(
            curl,
            [
                "curl",
                "-X POST",
                "'https://api.example.com/notes?draft=true'",
                "-H 'Content-Type: application/json'",
                "-H 'Authorization: Bearer tok'",
                r#"-d '{"text":"it'\''s"}'"#,
            ]
            .join(" \\\n  ")
        );

        let parsed = parse_curl(&curl).unwrap();
        assert_eq!(parsed.method, HttpMethod::POST);
        assert_eq!(parsed.body, request.body);
        assert_eq!(parsed.auth, request.auth);
        assert_eq!(parsed.query, request.query);
    }

    #[test]
    fn test_file_body_import_and_export() {
        let req = parse_curl("curl --data-binary @photo.png https://api.example.com/upload").unwrap();
        assert_eq!(req.method, HttpMethod::POST);
        assert_eq!(req.body, Some(Body::File("photo.png".into())));

        let request = Request::new(HttpMethod::PUT, "https://api.example.com/upload")
            .with_body(Body::File("my file.csv".into()));
        let curl = to_curl(&request);
        assert!(curl.ends_with("--data-binary '@my file.csv'"));
        assert!(curl.contains("-H 'Content-Type: text/csv'"));
    }

    #[test]
    fn test_decode_basic() {
        assert_eq!(
            decode_basic("Basic dXNlcjpwYXNz"),
            Some(("user".to_string(), "pass".to_string()))
        );
        assert_eq!(decode_basic("Bearer x"), None);

        let req = parse_curl("curl -H 'Authorization: Basic dXNlcjpwYXNz' http://localhost").unwrap();
        assert_eq!(
            req.auth,
            AuthConfig::Basic {
                username: "user".into(),
                password: "pass".into()
            }
        );
        assert!(req.headers.is_empty());
    }
}
