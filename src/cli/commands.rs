//! Command implementations
//!
//! Each command returns whether it succeeded; a sent request only succeeds
//! on a 2xx status.

use std::path::Path;

use anyhow::{anyhow, bail, Result};

use crate::auth::AuthConfig;
use crate::cli::{Cli, Commands, OutputArgs, RequestArgs};
use crate::config::Config;
use crate::curl::{parse_curl, to_curl};
use crate::http::{create_client, execute, load_assertions, Assertions};
use crate::models::{parse_header_arg, parse_query_arg, Body, Environment, HistoryEntry, HttpMethod, Request};
use crate::render::{
    print_collections, print_endpoints, print_environments, print_error, print_headers, print_history, print_info,
    print_report, print_request, print_response, print_schema_summary, print_success, print_test_results,
};
use crate::schema::{load_schema, ApiSchema, EndpointSchema, FileSchemaCache};
use crate::storage::Storage;
use crate::tui::{self, Session};
use crate::validator::{validate_request, RequestParts, ValidationReport};

/// What every command works with
pub struct Context {
    pub config: Config,
    pub storage: Storage,
    pub client: reqwest::Client,
}

impl Context {
    pub fn open(config: Config) -> Result<Self> {
        let storage = Storage::open(&config)?;
        let client = create_client(config.timeout);
        Ok(Context { config, storage, client })
    }

    /// The named environment, or the default one when it exists.
    /// Naming an environment that does not exist is an error.
    fn environment(&self, name: Option<&str>) -> Result<Option<Environment>> {
        match name {
            Some(name) => self
                .storage
                .load_environment(name)?
                .map(Some)
                .ok_or_else(|| anyhow!("Environment '{}' not found", name)),
            None => self.storage.load_environment(&self.config.default_env),
        }
    }

    async fn schema(&self, source: &str) -> Result<ApiSchema> {
        let cache = FileSchemaCache::new(self.config.schema_cache_dir());
        load_schema(source, &self.client, &cache).await
    }
}

/// Run a parsed command line
pub async fn run(cli: Cli, config: Config) -> Result<bool> {
    let ctx = Context::open(config)?;
    dispatch(&ctx, cli.command).await
}

pub async fn dispatch(ctx: &Context, command: Commands) -> Result<bool> {
    match command {
        Commands::Send {
            method,
            url,
            request,
            output,
        } => {
            let method: HttpMethod = method.parse()?;
            send(ctx, build_request(method, &url, &request)?, &output).await
        }
        Commands::Get { url, request, output } => {
            send(ctx, build_request(HttpMethod::GET, &url, &request)?, &output).await
        }
        Commands::Post { url, request, output } => {
            send(ctx, build_request(HttpMethod::POST, &url, &request)?, &output).await
        }
        Commands::Save {
            name,
            method,
            url,
            request,
            collection,
        } => {
            let request = build_request(method.parse()?, &url, &request)?;
            ctx.storage.save_request(&name, &request, &collection)?;
            print_success(&format!("Saved '{}' to collection '{}'", name, collection));
            Ok(true)
        }
        Commands::Run {
            name,
            collection,
            output,
        } => {
            let request = saved_request(ctx, &name, &collection)?;
            send(ctx, request, &output).await
        }
        Commands::Collections => {
            print_collections(&ctx.storage.load_collections()?);
            Ok(true)
        }
        Commands::Environments => {
            print_environments(&ctx.storage.load_environments()?);
            Ok(true)
        }
        Commands::EnvSet { env, key, value } => {
            ctx.storage.set_variable(&env, &key, &value)?;
            print_success(&format!("Set {} in environment '{}'", key, env));
            Ok(true)
        }
        Commands::History { limit } => {
            let limit = limit.unwrap_or(ctx.config.history_limit);
            print_history(&ctx.storage.load_history(limit)?);
            Ok(true)
        }
        Commands::Replay { index, output } => {
            let request = replay_request(ctx, index)?;
            send(ctx, request, &output).await
        }
        Commands::Test {
            name,
            collection,
            env,
            tests,
        } => {
            let request = saved_request(ctx, &name, &collection)?;
            let assertions = assertions_for(&name, tests.as_deref())?;
            let environment = ctx.environment(env.as_deref())?;

            // Test runs stay out of history
            let response = execute(&ctx.client, &request, environment.as_ref()).await?;
            let results = assertions.check(&response);
            print_test_results(&name, &results);
            Ok(results.iter().all(|r| r.passed))
        }
        Commands::Auth {
            auth_type,
            credentials,
            url,
        } => {
            let request = auth_check_request(&auth_type, &credentials, &url)?;
            print_info(&format!("Testing {} authentication...", request.auth.label()));
            let succeeded = send(ctx, request, &OutputArgs::default()).await?;
            if succeeded {
                print_success("Authentication test successful");
            } else {
                print_error("Authentication test failed");
            }
            Ok(succeeded)
        }
        Commands::Headers { url, method } => {
            let request = Request::new(method.parse()?, url);
            let environment = ctx.environment(None)?;
            let response = execute(&ctx.client, &request, environment.as_ref()).await?;
            record(&ctx.storage, &HistoryEntry::from_response(&response));
            print_headers(&response.headers);
            Ok(true)
        }
        Commands::Curl { name, collection, env } => {
            let request = saved_request(ctx, &name, &collection)?;
            let environment = ctx.environment(env.as_deref())?;
            println!("{}", to_curl(&request.resolved(environment.as_ref())));
            Ok(true)
        }
        Commands::ImportCurl {
            name,
            command,
            collection,
        } => {
            let request = parse_curl(&command)?;
            ctx.storage.save_request(&name, &request, &collection)?;
            print_success(&format!(
                "Imported {} {} as '{}' in collection '{}'",
                request.method, request.url, name, collection
            ));
            Ok(true)
        }
        Commands::Endpoints { schema, method } => {
            let method = method.map(|m| m.parse::<HttpMethod>()).transpose()?;
            let schema = ctx.schema(&schema).await?;
            print_schema_summary(&schema.summary());
            print_endpoints(&schema, method);
            Ok(true)
        }
        Commands::Validate {
            schema,
            method,
            path,
            headers,
            query,
            json,
        } => {
            let schema = ctx.schema(&schema).await?;
            let report = validate(&schema, &method, &path, &headers, &query, json.as_deref())?;
            print_report(&report);
            Ok(report.is_valid())
        }
        Commands::Interactive { schema, env } => {
            let schema = match schema {
                Some(source) => Some(ctx.schema(&source).await?),
                None => None,
            };
            let environment = ctx.environment(env.as_deref())?;
            let title = match &schema {
                Some(schema) => format!("{} {}", schema.title, schema.version),
                None => "New request".to_string(),
            };
            let session = Session {
                client: &ctx.client,
                storage: &ctx.storage,
                environment: environment.as_ref(),
                schema: schema.as_ref(),
            };
            tui::run(&session, &title).await?;
            Ok(true)
        }
        Commands::Config => {
            show_config(&ctx.config);
            Ok(true)
        }
    }
}

/// Assemble a request from command-line arguments
pub fn build_request(method: HttpMethod, url: &str, args: &RequestArgs) -> Result<Request> {
    let mut request = Request::new(method, url);

    for header in &args.headers {
        let (key, value) = parse_header_arg(header)?;
        request.headers.insert(key, value);
    }
    for param in &args.query {
        let (key, value) = parse_query_arg(param)?;
        request.query.insert(key, value);
    }

    let json = args.json.as_deref().or(args.body.as_deref());
    let body = match &args.file {
        Some(path) if !path.is_file() => bail!("File not found: {}", path.display()),
        Some(path) => Some(Body::File(path.clone())),
        None => Body::from_flags(json, &args.form, args.raw.as_deref())?,
    };
    if let Some(body) = body {
        request = request.with_body(body);
    }

    if let Some(auth) = &args.auth {
        request.auth = AuthConfig::parse(auth)?;
    }

    Ok(request)
}

fn saved_request(ctx: &Context, name: &str, collection: &str) -> Result<Request> {
    ctx.storage
        .load_request(name, collection)?
        .ok_or_else(|| anyhow!("Request '{}' not found in collection '{}'", name, collection))
}

/// What `sextant test` checks: the request's entry in a tests file, or a 200 status
fn assertions_for(name: &str, tests: Option<&Path>) -> Result<Assertions> {
    match tests {
        Some(path) => load_assertions(path, name)?
            .ok_or_else(|| anyhow!("No tests defined for request '{}' in {}", name, path.display())),
        None => Ok(Assertions::expect_ok()),
    }
}

/// GET request carrying credentials given as `TYPE CREDENTIALS`
fn auth_check_request(auth_type: &str, credentials: &str, url: &str) -> Result<Request> {
    let auth = AuthConfig::parse(&format!("{}:{}", auth_type.to_lowercase(), credentials)).map_err(|err| {
        anyhow!(
            "{}. Examples: auth bearer TOKEN | auth basic USER:PASS | auth apikey X-API-Key:KEY",
            err
        )
    })?;
    Ok(Request {
        auth,
        ..Request::new(HttpMethod::GET, url)
    })
}

/// History entry `index` (1 = most recent) as a bare request
fn replay_request(ctx: &Context, index: usize) -> Result<Request> {
    if index == 0 {
        bail!("History index starts at 1");
    }
    let history = ctx.storage.load_history(index)?;
    let entry = history
        .get(index - 1)
        .ok_or_else(|| anyhow!("No history entry #{} ({} recorded)", index, history.len()))?;
    Ok(Request::new(entry.method, entry.url.clone()))
}

async fn send(ctx: &Context, request: Request, output: &OutputArgs) -> Result<bool> {
    let environment = ctx.environment(output.env.as_deref())?;

    if output.verbose {
        print_request(&request.resolved(environment.as_ref()));
    }

    match execute(&ctx.client, &request, environment.as_ref()).await {
        Ok(response) => {
            record(&ctx.storage, &HistoryEntry::from_response(&response));
            print_response(&response, !output.no_headers);
            Ok((200..300).contains(&response.status))
        }
        Err(err) => {
            record(&ctx.storage, &HistoryEntry::failed(&request.resolved(environment.as_ref())));
            Err(err)
        }
    }
}

fn record(storage: &Storage, entry: &HistoryEntry) {
    if let Err(err) = storage.add_to_history(entry) {
        tracing::warn!(error = %err, "Could not record history");
    }
}

/// The endpoint for `method path`. When only the path matches, that
/// endpoint is returned so the method mismatch shows up in the report.
fn matching_endpoint<'s>(schema: &'s ApiSchema, method: HttpMethod, path: &str) -> Option<&'s EndpointSchema> {
    schema
        .find_endpoint(method, path)
        .or_else(|| HttpMethod::ALL.iter().find_map(|m| schema.find_endpoint(*m, path)))
}

/// Check a request described on the command line against a schema
pub fn validate(
    schema: &ApiSchema,
    method: &str,
    path: &str,
    headers: &[String],
    query: &[String],
    json: Option<&str>,
) -> Result<ValidationReport> {
    let parsed: HttpMethod = method.parse()?;
    let endpoint = matching_endpoint(schema, parsed, path)
        .ok_or_else(|| anyhow!("No endpoint matches {} {}", parsed, path))?;

    let mut parts = RequestParts::new().method(method).path(path);
    for header in headers {
        let (key, value) = parse_header_arg(header)?;
        parts = parts.header(key, value);
    }
    for param in query {
        let (key, value) = parse_query_arg(param)?;
        parts = parts.query_param(key, value);
    }
    if let Some(json) = json {
        parts = parts.text_body(json);
    }

    Ok(validate_request(endpoint, &parts))
}

fn show_config(config: &Config) {
    print_info(&format!("sextant {}", crate::constants::APP_VERSION));
    println!("Home:          {}", config.home.display());
    println!("Collections:   {}", config.collections_file().display());
    println!("Environments:  {}", config.environments_file().display());
    println!("History:       {}", config.history_file().display());
    println!("Schema cache:  {}", config.schema_cache_dir().display());
    println!("Log file:      {}", config.log_file().display());
    println!("Timeout:       {}s", config.timeout.as_secs());
    println!("Environment:   {}", config.default_env);
}
