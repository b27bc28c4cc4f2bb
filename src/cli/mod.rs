//! Command-line interface

pub mod commands;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::Config;
use crate::constants::{DEFAULT_AUTH_TEST_URL, DEFAULT_COLLECTION};

pub use commands::run;

/// Terminal HTTP API client with schema-driven request building
#[derive(Parser, Debug)]
#[command(name = "sextant", version)]
pub struct Cli {
    /// Configuration directory (default: ~/.sextant, or $SEXTANT_HOME)
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Configuration from the environment with command-line overrides applied
    pub fn config(&self) -> Config {
        let mut config = Config::load();
        if let Some(home) = &self.home {
            config.home = home.clone();
        }
        if let Some(secs) = self.timeout.filter(|s| *s > 0) {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }
}

/// Headers, query, body and auth for a request
#[derive(Args, Debug, Clone, Default)]
pub struct RequestArgs {
    /// Header as 'Key: Value' (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Query parameter as key=value (repeatable)
    #[arg(short = 'q', long = "query")]
    pub query: Vec<String>,

    /// JSON body; kept as raw text when it does not parse
    #[arg(short = 'j', long, conflicts_with_all = ["form", "raw", "body"])]
    pub json: Option<String>,

    /// Form field as key=value (repeatable)
    #[arg(short = 'f', long, conflicts_with_all = ["raw", "body"])]
    pub form: Vec<String>,

    /// Raw body
    #[arg(short = 'r', long, conflicts_with = "body")]
    pub raw: Option<String>,

    /// Body, sent as JSON when it parses
    #[arg(short = 'b', long)]
    pub body: Option<String>,

    /// Send a file as the body; Content-Type follows its extension
    #[arg(long, value_name = "PATH", conflicts_with_all = ["json", "form", "raw", "body"])]
    pub file: Option<PathBuf>,

    /// Auth: bearer:TOKEN, basic:USER:PASS or apikey:NAME:VALUE[:header|query]
    #[arg(short = 'a', long)]
    pub auth: Option<String>,
}

/// How a response is shown
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Environment for {{variable}} substitution
    #[arg(short = 'e', long = "env")]
    pub env: Option<String>,

    /// Hide response headers
    #[arg(long)]
    pub no_headers: bool,

    /// Print the request before sending
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a request
    Send {
        /// HTTP method
        method: String,
        url: String,
        #[command(flatten)]
        request: RequestArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Send a GET request
    Get {
        url: String,
        #[command(flatten)]
        request: RequestArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Send a POST request
    Post {
        url: String,
        #[command(flatten)]
        request: RequestArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Save a request to a collection
    Save {
        name: String,
        #[arg(short = 'm', long, default_value = "GET")]
        method: String,
        #[arg(short = 'u', long)]
        url: String,
        #[command(flatten)]
        request: RequestArgs,
        #[arg(short = 'c', long, default_value = DEFAULT_COLLECTION)]
        collection: String,
    },

    /// Send a saved request
    Run {
        name: String,
        #[arg(short = 'c', long, default_value = DEFAULT_COLLECTION)]
        collection: String,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// List collections and their requests
    Collections,

    /// List environments and their variables
    Environments,

    /// Set a variable in an environment
    EnvSet { env: String, key: String, value: String },

    /// Show recent requests, newest first
    History {
        #[arg(short = 'l', long)]
        limit: Option<usize>,
    },

    /// Send a request from history again (1 = most recent)
    Replay {
        index: usize,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Send a saved request and check the response
    Test {
        name: String,
        #[arg(short = 'c', long, default_value = DEFAULT_COLLECTION)]
        collection: String,
        /// Environment for {{variable}} substitution
        #[arg(short = 'e', long = "env")]
        env: Option<String>,
        /// YAML or JSON file with `tests: {NAME: {...}}`; without it the status must be 200
        #[arg(short = 't', long = "tests")]
        tests: Option<PathBuf>,
    },

    /// Try credentials against a URL
    Auth {
        /// bearer, basic or apikey
        auth_type: String,
        /// TOKEN, USER:PASS or NAME:VALUE[:header|query]
        credentials: String,
        #[arg(short = 'u', long, default_value = DEFAULT_AUTH_TEST_URL)]
        url: String,
    },

    /// Show the response headers of a URL
    Headers {
        url: String,
        #[arg(short = 'm', long, default_value = "HEAD")]
        method: String,
    },

    /// Print a saved request as a cURL command
    Curl {
        name: String,
        #[arg(short = 'c', long, default_value = DEFAULT_COLLECTION)]
        collection: String,
        /// Environment for {{variable}} substitution
        #[arg(short = 'e', long = "env")]
        env: Option<String>,
    },

    /// Save a cURL command as a request
    ImportCurl {
        name: String,
        /// The cURL command, quoted
        command: String,
        #[arg(short = 'c', long, default_value = DEFAULT_COLLECTION)]
        collection: String,
    },

    /// List the endpoints of an API schema
    Endpoints {
        /// Schema file, project directory or API base URL
        schema: String,
        /// Only this method
        #[arg(short = 'm', long)]
        method: Option<String>,
    },

    /// Check a request against an API schema without sending it
    Validate {
        /// Schema file, project directory or API base URL
        schema: String,
        method: String,
        path: String,
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
        #[arg(short = 'q', long = "query")]
        query: Vec<String>,
        /// JSON body
        #[arg(short = 'j', long)]
        json: Option<String>,
    },

    /// Build requests interactively, from a schema when one is given
    Interactive {
        /// Schema file, project directory or API base URL
        #[arg(short = 's', long)]
        schema: Option<String>,
        /// Environment for {{variable}} substitution
        #[arg(short = 'e', long = "env")]
        env: Option<String>,
    },

    /// Show configuration paths and settings
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn verify_cli_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_send_flags() {
        let cli = Cli::try_parse_from([
            "sextant", "send", "PUT", "http://localhost/x", "-H", "X-A: 1", "-H", "X-B: 2", "-q", "a=1", "-j",
            r#"{"k":1}"#, "-a", "bearer:t", "-e", "dev", "--no-headers",
        ])
        .unwrap();

        let Commands::Send { method, url, request, output } = cli.command else {
            panic!("expected send");
        };
        assert_eq!(method, "PUT");
        assert_eq!(url, "http://localhost/x");
        assert_eq!(request.headers, vec!["X-A: 1", "X-B: 2"]);
        assert_eq!(request.query, vec!["a=1"]);
        assert_eq!(request.json.as_deref(), Some(r#"{"k":1}"#));
        assert_eq!(request.auth.as_deref(), Some("bearer:t"));
        assert_eq!(output.env.as_deref(), Some("dev"));
        assert!(output.no_headers);
        assert!(!output.verbose);
    }

    #[test]
    fn test_body_flags_conflict() {
        let result = Cli::try_parse_from(["sextant", "post", "http://x", "-j", "{}", "-r", "raw"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults_and_global_overrides() {
        let cli = Cli::try_parse_from(["sextant", "run", "ping", "--home", "/tmp/sx", "--timeout", "5"]).unwrap();
        let config = cli.config();
        assert_eq!(config.home, PathBuf::from("/tmp/sx"));
        assert_eq!(config.timeout, Duration::from_secs(5));

        let Commands::Run { name, collection, .. } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(name, "ping");
        assert_eq!(collection, "default");
    }

    #[test]
    fn test_kebab_case_command_names() {
        assert!(Cli::try_parse_from(["sextant", "env-set", "dev", "k", "v"]).is_ok());
        assert!(Cli::try_parse_from(["sextant", "import-curl", "n", "curl http://x"]).is_ok());
        assert!(Cli::try_parse_from(["sextant", "validate", "api.yaml", "GET", "/users", "-q", "page=1"]).is_ok());
    }

    #[test]
    fn test_file_body_and_inspection_commands() {
        let cli = Cli::try_parse_from(["sextant", "post", "http://x", "--file", "photo.png"]).unwrap();
        let Commands::Post { request, .. } = cli.command else {
            panic!("expected post");
        };
        assert_eq!(request.file, Some(PathBuf::from("photo.png")));
        assert!(Cli::try_parse_from(["sextant", "post", "http://x", "--file", "a", "-j", "{}"]).is_err());

        let cli = Cli::try_parse_from(["sextant", "headers", "http://x"]).unwrap();
        let Commands::Headers { method, .. } = cli.command else {
            panic!("expected headers");
        };
        assert_eq!(method, "HEAD");

        let cli = Cli::try_parse_from(["sextant", "auth", "basic", "u:p"]).unwrap();
        let Commands::Auth { url, .. } = cli.command else {
            panic!("expected auth");
        };
        assert_eq!(url, DEFAULT_AUTH_TEST_URL);

        let cli = Cli::try_parse_from(["sextant", "test", "ping", "-t", "tests.yaml"]).unwrap();
        let Commands::Test { tests, collection, .. } = cli.command else {
            panic!("expected test");
        };
        assert_eq!(tests, Some(PathBuf::from("tests.yaml")));
        assert_eq!(collection, "default");
    }
}
