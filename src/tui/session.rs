//! Session flow - endpoint picking, prompting, validating and sending

use anyhow::Result;
use ratatui::backend::Backend;

use crate::auth::{AuthConfig, KeyLocation};
use crate::constants::DEFAULT_COLLECTION;
use crate::http::execute;
use crate::models::{parse_header_arg, parse_query_arg, Body, Environment, HistoryEntry, HttpMethod, Request};
use crate::planner::{collect_body, collect_params, plan_body, plan_params, PromptDescriptor};
use crate::render::{status_tone, Tone};
use crate::schema::{ApiSchema, AuthKind, AuthRequirement, EndpointSchema};
use crate::storage::Storage;
use crate::tui::draw::{report_view, response_lines, response_title};
use crate::tui::events::EventSource;
use crate::tui::Screen;
use crate::validator::{validate_request, RequestParts, ValidationReport};

/// What a session works with
pub struct Session<'a> {
    pub client: &'a reqwest::Client,
    pub storage: &'a Storage,
    pub environment: Option<&'a Environment>,
    /// Without a schema requests are built by hand
    pub schema: Option<&'a ApiSchema>,
}

/// A request ready to send, with its report when built from a schema
struct Built {
    request: Request,
    report: Option<ValidationReport>,
}

/// Build, check, send and save requests until the user stops
pub async fn run_session<B: Backend, E: EventSource>(screen: &mut Screen<B, E>, session: &Session<'_>) -> Result<()> {
    loop {
        let built = match session.schema {
            Some(schema) => build_from_schema(screen, schema)?,
            None => build_manual(screen)?,
        };
        let Some(built) = built else {
            break;
        };

        let send_default = match &built.report {
            Some(report) => {
                screen.view(" Validation ", report_view(report))?;
                report.is_valid()
            }
            None => true,
        };

        if screen.confirm("Send request?", send_default)? {
            send_and_show(screen, session, &built.request).await?;
        }

        if screen.confirm("Save request to a collection?", false)? {
            save_request(screen, session.storage, &built.request)?;
        }

        if !screen.confirm("Build another request?", false)? {
            break;
        }
    }
    Ok(())
}

fn required(text: &str) -> Result<(), String> {
    if text.is_empty() {
        Err("A value is required".to_string())
    } else {
        Ok(())
    }
}

fn optional(_: &str) -> Result<(), String> {
    Ok(())
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

fn pick_endpoint<'s, B: Backend, E: EventSource>(
    screen: &mut Screen<B, E>,
    schema: &'s ApiSchema,
) -> Result<Option<&'s EndpointSchema>> {
    let listed = schema.list_endpoints(None);
    let labels: Vec<String> = listed
        .iter()
        .map(|(method, path)| {
            let summary = schema
                .find_endpoint(*method, path)
                .and_then(|e| e.summary.clone())
                .unwrap_or_default();
            format!("{:<7} {}  {}", method.as_str(), path, summary)
                .trim_end()
                .to_string()
        })
        .collect();

    let Some(index) = screen.pick("Endpoint", &labels, false, 0)? else {
        return Ok(None);
    };
    let (method, path) = &listed[index];
    Ok(schema.find_endpoint(*method, path))
}

fn build_from_schema<B: Backend, E: EventSource>(screen: &mut Screen<B, E>, schema: &ApiSchema) -> Result<Option<Built>> {
    let Some(endpoint) = pick_endpoint(screen, schema)? else {
        return Ok(None);
    };
    screen.set_title(format!("{} {}", endpoint.method, endpoint.path));
    tracing::info!(method = %endpoint.method, path = %endpoint.path, "Building request");

    // Fill path placeholders; skipped ones stay as `{name}`
    let mut path = endpoint.path.clone();
    for name in endpoint.path_params() {
        let label = format!("Path parameter {}", name);
        if let Some(value) = screen.read_line(&label, Some("required".into()), "", false, required)? {
            path = path.replace(&format!("{{{}}}", name), &value);
        }
    }

    let default_url = join_url(&schema.base_url, &path);
    let url = screen
        .read_line("URL", None, &default_url, false, required)?
        .unwrap_or(default_url);

    let mut request = Request::new(endpoint.method, url);
    if let Some(requirement) = &endpoint.auth {
        request.auth = ask_auth(screen, requirement)?;
    }
    let (header_plan, query_plan) = param_plans(endpoint);
    request.headers = collect_params(screen, &header_plan)?;
    request.query = collect_params(screen, &query_plan)?;

    let body = match &endpoint.body {
        Some(body) => collect_body(screen, &plan_body(body))?,
        None => None,
    };

    // Checked against the template path, before Content-Type is added
    let mut parts = RequestParts::from_request(&request).path(path);
    if let Some(value) = &body {
        parts = parts.json_body(value.clone());
    }
    let report = validate_request(endpoint, &parts);
    tracing::info!(errors = report.errors.len(), warnings = report.warnings.len(), "Validated request");

    if let Some(value) = body {
        request = request.with_body(Body::Json(value));
    }

    Ok(Some(Built {
        request,
        report: Some(report),
    }))
}

/// Header and query prompts, with paths named like the validator's fields
fn param_plans(endpoint: &EndpointSchema) -> (Vec<PromptDescriptor>, Vec<PromptDescriptor>) {
    (
        plan_params(&endpoint.headers, "headers"),
        plan_params(&endpoint.query_params, "query"),
    )
}

fn ask_auth<B: Backend, E: EventSource>(screen: &mut Screen<B, E>, requirement: &AuthRequirement) -> Result<AuthConfig> {
    screen.note(
        Tone::Info,
        format!("Endpoint uses {} auth ({})", requirement.auth_type.as_str(), requirement.scheme),
    );

    let auth = match requirement.auth_type {
        AuthKind::Bearer => match screen.read_line("Bearer token", None, "", true, optional)? {
            Some(token) if !token.is_empty() => AuthConfig::Bearer { token },
            _ => AuthConfig::None,
        },
        AuthKind::Basic => match screen.read_line("Username", None, "", false, optional)? {
            Some(username) if !username.is_empty() => {
                let password = screen
                    .read_line("Password", None, "", true, optional)?
                    .unwrap_or_default();
                AuthConfig::Basic { username, password }
            }
            _ => AuthConfig::None,
        },
        AuthKind::ApiKey => {
            let name = screen
                .read_line("API key header", None, "X-API-Key", false, required)?
                .unwrap_or_else(|| "X-API-Key".to_string());
            match screen.read_line("API key", None, "", true, optional)? {
                Some(value) if !value.is_empty() => AuthConfig::ApiKey {
                    name,
                    value,
                    location: KeyLocation::Header,
                },
                _ => AuthConfig::None,
            }
        }
    };
    Ok(auth)
}

fn build_manual<B: Backend, E: EventSource>(screen: &mut Screen<B, E>) -> Result<Option<Built>> {
    screen.set_title("New request");

    let methods: Vec<String> = HttpMethod::ALL.iter().map(|m| m.to_string()).collect();
    let Some(index) = screen.pick("Method", &methods, false, 0)? else {
        return Ok(None);
    };
    let method = HttpMethod::ALL[index];

    let Some(url) = screen.read_line("URL", None, "", false, required)? else {
        return Ok(None);
    };
    let mut request = Request::new(method, url);

    while let Some(line) = screen.read_line("Header (Key: Value, empty to finish)", None, "", false, |t| {
        if t.is_empty() {
            Ok(())
        } else {
            parse_header_arg(t).map(|_| ()).map_err(|e| e.to_string())
        }
    })? {
        if line.is_empty() {
            break;
        }
        let (key, value) = parse_header_arg(&line)?;
        request.headers.insert(key, value);
    }

    while let Some(line) = screen.read_line("Query (key=value, empty to finish)", None, "", false, |t| {
        if t.is_empty() {
            Ok(())
        } else {
            parse_query_arg(t).map(|_| ()).map_err(|e| e.to_string())
        }
    })? {
        if line.is_empty() {
            break;
        }
        let (key, value) = parse_query_arg(&line)?;
        request.query.insert(key, value);
    }

    let auth_hint = Some("bearer:TOKEN | basic:USER:PASS | apikey:NAME:VALUE".to_string());
    if let Some(text) = screen.read_line("Auth", auth_hint, "", true, |t| {
        if t.is_empty() {
            Ok(())
        } else {
            AuthConfig::parse(t).map(|_| ()).map_err(|e| e.to_string())
        }
    })? {
        if !text.is_empty() {
            request.auth = AuthConfig::parse(&text)?;
        }
    }

    if method.has_body() {
        if let Some(value) = screen.read_json("Body", optional)? {
            request = request.with_body(Body::Json(value));
        }
    }

    screen.set_title(format!("{} {}", request.method, request.url));
    Ok(Some(Built { request, report: None }))
}

async fn send_and_show<B: Backend, E: EventSource>(
    screen: &mut Screen<B, E>,
    session: &Session<'_>,
    request: &Request,
) -> Result<()> {
    screen.busy(format!("Sending {} {} ...", request.method, request.url))?;

    match execute(session.client, request, session.environment).await {
        Ok(response) => {
            record(session.storage, &HistoryEntry::from_response(&response));
            screen.note(
                status_tone(response.status),
                format!("{} {} in {}ms", response.status, response.url, response.elapsed_ms),
            );
            screen.view(response_title(&response), response_lines(&response))?;
        }
        Err(err) => {
            tracing::warn!(error = %err, "Request failed");
            record(session.storage, &HistoryEntry::failed(request));
            screen.note(Tone::Bad, err.to_string());
        }
    }
    Ok(())
}

fn record(storage: &Storage, entry: &HistoryEntry) {
    if let Err(err) = storage.add_to_history(entry) {
        tracing::warn!(error = %err, "Could not record history");
    }
}

fn save_request<B: Backend, E: EventSource>(screen: &mut Screen<B, E>, storage: &Storage, request: &Request) -> Result<()> {
    let Some(name) = screen.read_line("Request name", None, "", false, required)? else {
        return Ok(());
    };
    let collection = screen
        .read_line("Collection", None, DEFAULT_COLLECTION, false, required)?
        .unwrap_or_else(|| DEFAULT_COLLECTION.to_string());

    storage.save_request(&name, request, &collection)?;
    screen.note(Tone::Good, format!("Saved '{}' to collection '{}'", name, collection));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::http::create_client;
    use crate::schema::{FieldDef, FieldKind};
    use crate::tui::events::QueuedEvents as Q;
    use crate::tui::testing::screen;
    use crossterm::event::{Event, KeyCode};
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    fn schema() -> ApiSchema {
        let mut endpoint = EndpointSchema::new(HttpMethod::POST, "/users/{id}");
        endpoint.summary = Some("Update user".into());
        endpoint
            .query_params
            .insert("limit".into(), FieldDef::new(FieldKind::Integer));
        endpoint.body = Some(
            FieldDef::new(FieldKind::Object)
                .required()
                .property("name", FieldDef::new(FieldKind::String).required()),
        );

        ApiSchema {
            title: "Test".into(),
            version: "1".into(),
            base_url: "https://api.test/".into(),
            endpoints: vec![endpoint, EndpointSchema::new(HttpMethod::GET, "/health")],
            components: IndexMap::new(),
            security_schemes: IndexMap::new(),
        }
    }

    fn events(parts: Vec<Vec<Event>>) -> Vec<Event> {
        parts.into_iter().flatten().collect()
    }

    #[tokio::test]
    async fn test_schema_session_builds_validates_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(&Config::with_home(dir.path())).unwrap();
        let client = create_client(Duration::from_secs(1));
        let schema = schema();
        let session = Session {
            client: &client,
            storage: &storage,
            environment: None,
            schema: Some(&schema),
        };

        // Endpoints are listed by path: /health, then /users/{id}
        let mut screen = screen(events(vec![
            vec![Q::key(KeyCode::Down), Q::key(KeyCode::Enter)],
            Q::typed("7"),
            vec![Q::key(KeyCode::Enter)],
            vec![Q::key(KeyCode::Enter)],
            vec![Q::key(KeyCode::Esc)],
            Q::typed("ada"),
            vec![Q::key(KeyCode::Enter)],
            vec![Q::key(KeyCode::Enter)],
            Q::typed("n"),
            Q::typed("y"),
            Q::typed("create"),
            vec![Q::key(KeyCode::Enter), Q::key(KeyCode::Enter)],
            Q::typed("n"),
        ]));

        run_session(&mut screen, &session).await.unwrap();

        let saved = storage.load_request("create", DEFAULT_COLLECTION).unwrap().unwrap();
        assert_eq!(saved.method, HttpMethod::POST);
        assert_eq!(saved.url, "https://api.test/users/7");
        assert_eq!(saved.body, Some(Body::Json(json!({"name": "ada"}))));
        assert!(saved.query.is_empty());

        let transcript: Vec<&str> = screen.state.transcript.iter().map(|(_, t)| t.as_str()).collect();
        assert!(transcript.contains(&"Path parameter id: 7"));
        assert!(transcript.contains(&"Send request? no"));
        assert!(transcript.contains(&"Saved 'create' to collection 'default'"));
    }

    #[tokio::test]
    async fn test_manual_session_collects_headers_and_body() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(&Config::with_home(dir.path())).unwrap();
        let client = create_client(Duration::from_secs(1));
        let session = Session {
            client: &client,
            storage: &storage,
            environment: None,
            schema: None,
        };

        let mut screen = screen(events(vec![
            vec![Q::key(KeyCode::Down), Q::key(KeyCode::Enter)],
            Q::typed("http://localhost:1/things"),
            vec![Q::key(KeyCode::Enter)],
            Q::typed("X-Trace: 1"),
            vec![Q::key(KeyCode::Enter), Q::key(KeyCode::Enter)],
            Q::typed("page=2"),
            vec![Q::key(KeyCode::Enter), Q::key(KeyCode::Enter)],
            Q::typed("bearer:tok"),
            vec![Q::key(KeyCode::Enter)],
            Q::typed(r#"{"a":1}"#),
            vec![Q::ctrl('d')],
            Q::typed("n"),
            Q::typed("y"),
            Q::typed("thing"),
            vec![Q::key(KeyCode::Enter)],
            vec![Q::key(KeyCode::Backspace); DEFAULT_COLLECTION.len()],
            Q::typed("scratch"),
            vec![Q::key(KeyCode::Enter)],
            Q::typed("n"),
        ]));

        run_session(&mut screen, &session).await.unwrap();

        let saved = storage.load_request("thing", "scratch").unwrap().unwrap();
        assert_eq!(saved.method, HttpMethod::POST);
        assert_eq!(saved.headers["X-Trace"], "1");
        assert_eq!(saved.headers["Content-Type"], "application/json");
        assert_eq!(saved.query["page"], "2");
        assert_eq!(saved.auth, AuthConfig::Bearer { token: "tok".into() });
        assert_eq!(saved.body, Some(Body::Json(json!({"a": 1}))));
    }

    #[tokio::test]
    async fn test_escape_on_first_pick_ends_session() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(&Config::with_home(dir.path())).unwrap();
        let client = create_client(Duration::from_secs(1));
        let schema = schema();
        let session = Session {
            client: &client,
            storage: &storage,
            environment: None,
            schema: Some(&schema),
        };

        let mut screen = screen(vec![Q::key(KeyCode::Esc)]);
        run_session(&mut screen, &session).await.unwrap();
        assert!(storage.load_collections().unwrap().is_empty());
    }

    #[test]
    fn test_param_prompt_paths_match_validator_fields() {
        let mut endpoint = EndpointSchema::new(HttpMethod::GET, "/things");
        endpoint
            .headers
            .insert("X-Tenant".into(), FieldDef::new(FieldKind::String).required());
        endpoint
            .query_params
            .insert("page".into(), FieldDef::new(FieldKind::Integer).required());

        let (headers, query) = param_plans(&endpoint);
        assert_eq!(headers[0].path, "headers.X-Tenant");
        assert_eq!(query[0].path, "query.page");

        let report = validate_request(&endpoint, &RequestParts::new());
        let fields: Vec<&str> = report.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec![headers[0].path.as_str(), query[0].path.as_str()]);
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://a.test/", "/x"), "https://a.test/x");
        assert_eq!(join_url("https://a.test/v1", "/x"), "https://a.test/v1/x");
    }
}
