//! Application constants
//!
//! Centralized location for magic strings and configuration defaults.

/// Application name
pub const APP_NAME: &str = "sextant";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory (under the user's home) holding collections, environments and history
pub const APP_DIR_NAME: &str = ".sextant";

/// Overrides the configuration directory
pub const HOME_ENV: &str = "SEXTANT_HOME";

/// Overrides the request timeout, in seconds
pub const TIMEOUT_ENV: &str = "SEXTANT_TIMEOUT_SECS";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Number of history entries shown when no limit is given
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Environment used when none is selected
pub const DEFAULT_ENVIRONMENT: &str = "default";

/// Collection used when none is selected
pub const DEFAULT_COLLECTION: &str = "default";

/// Log file written inside the configuration directory
pub const LOG_FILE_NAME: &str = "sextant.log";

/// Endpoint hit by `sextant auth` when no URL is given
pub const DEFAULT_AUTH_TEST_URL: &str = "https://httpbin.org/bearer";

/// Base URL assumed for schema files that declare no servers
pub const FALLBACK_BASE_URL: &str = "https://api.example.com";

/// Fallback title for schemas without `info.title`
pub const DEFAULT_SCHEMA_TITLE: &str = "API";

/// Fallback version for schemas without `info.version`
pub const DEFAULT_SCHEMA_VERSION: &str = "1.0.0";

/// Maximum `$ref` hops (and nested fragments) followed while resolving one schema node
pub const MAX_REF_DEPTH: usize = 32;

/// Maximum nesting the validator descends into a request body
pub const MAX_VALIDATION_DEPTH: usize = 64;

/// Paths probed, in order, when fetching a schema from a running API
pub const SCHEMA_PROBE_PATHS: &[&str] = &[
    "/openapi.json",
    "/swagger.json",
    "/docs/openapi.json",
    "/api-docs",
    "/swagger/v1/swagger.json",
    "/v1/openapi.json",
    "/api/openapi.json",
];

/// Spec file names looked for when a directory is given as schema source
pub const SCHEMA_FILE_CANDIDATES: &[&str] = &[
    "openapi.yaml",
    "openapi.yml",
    "openapi.json",
    "swagger.yaml",
    "swagger.yml",
    "swagger.json",
    "api/openapi.yaml",
    "api/openapi.yml",
    "docs/openapi.yaml",
    "docs/swagger.yaml",
];

/// Content types accepted for request bodies, in preference order
pub const BODY_CONTENT_TYPES: &[&str] = &[
    "application/json",
    "application/x-www-form-urlencoded",
    "multipart/form-data",
];
