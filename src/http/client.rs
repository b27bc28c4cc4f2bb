//! HTTP client wrapper - executes requests and wraps responses

use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};

use crate::models::{Body, Environment, HttpMethod, Request, ResponseData};

/// Build a request from the given parameters. Fails only when a file body cannot be read.
pub fn build_request(
    client: &reqwest::Client,
    request: &Request,
    environment: Option<&Environment>,
) -> Result<reqwest::RequestBuilder> {
    // Apply environment variable substitution
    let request = request.resolved(environment);

    let method = match request.method {
        HttpMethod::GET => reqwest::Method::GET,
        HttpMethod::POST => reqwest::Method::POST,
        HttpMethod::PUT => reqwest::Method::PUT,
        HttpMethod::PATCH => reqwest::Method::PATCH,
        HttpMethod::DELETE => reqwest::Method::DELETE,
        HttpMethod::HEAD => reqwest::Method::HEAD,
        HttpMethod::OPTIONS => reqwest::Method::OPTIONS,
    };

    // Auth lands in headers or query
    let mut headers = request.headers.clone();
    let mut query = request.query.clone();
    request.auth.apply(&mut headers, &mut query);

    let mut req_builder = client.request(method, &request.url);

    for (key, value) in &headers {
        req_builder = req_builder.header(key.as_str(), value.as_str());
    }

    if !query.is_empty() {
        let pairs: Vec<(&str, &str)> = query.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        req_builder = req_builder.query(&pairs);
    }

    // Add body
    match &request.body {
        Some(Body::Json(value)) => {
            req_builder = req_builder.json(value);
        }
        Some(Body::Form(fields)) => {
            req_builder = req_builder.form(fields);
        }
        Some(Body::Raw(text)) if !text.is_empty() => {
            req_builder = req_builder.body(text.clone());
        }
        Some(Body::File(path)) => {
            let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            req_builder = req_builder.body(bytes);
        }
        _ => {}
    }

    Ok(req_builder)
}

/// Execute an HTTP request and return the buffered response
pub async fn execute(
    client: &reqwest::Client,
    request: &Request,
    environment: Option<&Environment>,
) -> Result<ResponseData> {
    let start = Instant::now();
    let req_builder = build_request(client, request, environment)?;

    tracing::info!(method = %request.method, url = %request.url, "Sending request");

    let resp = req_builder.send().await.map_err(|e| {
        if e.is_timeout() {
            anyhow!("Request timed out")
        } else if e.is_connect() {
            anyhow!("Connection failed: {}", e)
        } else {
            anyhow!("Request failed: {}", e)
        }
    })?;

    let status = resp.status().as_u16();
    let url = resp.url().to_string();
    let headers: Vec<(String, String)> = resp
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("<binary>").to_string()))
        .collect();

    let body = resp
        .text()
        .await
        .map_err(|e| anyhow!("Error reading body: {}", e))?;
    let elapsed_ms = start.elapsed().as_millis() as u64;
    let json = serde_json::from_str::<serde_json::Value>(&body).ok();

    tracing::info!(status, elapsed_ms, "Received response");

    Ok(ResponseData {
        method: request.method,
        url,
        status,
        headers,
        body,
        json,
        elapsed_ms,
    })
}

/// Create an HTTP client with the given timeout
pub fn create_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("sextant/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
