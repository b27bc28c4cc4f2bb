//! Where schema documents come from: files, project directories and running APIs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;

use crate::constants::{FALLBACK_BASE_URL, SCHEMA_FILE_CANDIDATES, SCHEMA_PROBE_PATHS};
use crate::schema::loader::parse_document;
use crate::schema::model::ApiSchema;

/// Stores fetched schema documents by source URL
pub trait SchemaCache {
    fn get(&self, url: &str) -> Option<Value>;
    fn put(&self, url: &str, document: &Value) -> Result<()>;
}

/// One JSON file per URL inside a directory
pub struct FileSchemaCache {
    dir: PathBuf,
}

impl FileSchemaCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileSchemaCache { dir: dir.into() }
    }

    fn path_for(&self, url: &str) -> PathBuf {
        let key: String = url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", key))
    }
}

impl SchemaCache for FileSchemaCache {
    fn get(&self, url: &str) -> Option<Value> {
        let content = fs::read_to_string(self.path_for(url)).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn put(&self, url: &str, document: &Value) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.path_for(url);
        let content = serde_json::to_string(document)?;
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Decode a schema file, YAML for `.yaml`/`.yml`, JSON otherwise
pub fn read_document(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema file {}", path.display()))?;

    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
        .unwrap_or(false);

    // Determine if JSON or YAML
    let document = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?
    };
    Ok(document)
}

/// `servers[0].url`, or the fallback base URL
pub fn server_url(document: &Value) -> String {
    document
        .get("servers")
        .and_then(|s| s.as_array())
        .and_then(|s| s.first())
        .and_then(|s| s.get("url"))
        .and_then(|u| u.as_str())
        .unwrap_or(FALLBACK_BASE_URL)
        .to_string()
}

/// Load a schema from a file
pub fn load_schema_file(path: &Path) -> Result<ApiSchema> {
    let document = read_document(path)?;
    let base_url = server_url(&document);
    tracing::info!(path = %path.display(), "Loading schema file");
    Ok(parse_document(&document, &base_url))
}

/// First well-known spec file inside a directory
pub fn find_schema_file(dir: &Path) -> Option<PathBuf> {
    SCHEMA_FILE_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Fetch a schema from a running API by probing common documentation paths.
/// The first document found is cached; when every probe fails the cached copy is used.
pub async fn fetch_schema(
    client: &reqwest::Client,
    base_url: &str,
    cache: &dyn SchemaCache,
) -> Result<ApiSchema> {
    let base = normalize_base_url(base_url);
    let root = reqwest::Url::parse(&format!("{}/", base))
        .with_context(|| format!("Invalid base URL: {}", base_url))?;

    for probe in SCHEMA_PROBE_PATHS {
        let url = root.join(probe.trim_start_matches('/'))?;
        tracing::debug!(url = %url, "Probing for schema");

        let response = match client.get(url.clone()).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(_) => continue,
            Err(err) => {
                tracing::debug!(url = %url, error = %err, "Schema probe failed");
                continue;
            }
        };

        let Ok(document) = response.json::<Value>().await else {
            continue;
        };
        if document.get("paths").is_none() {
            continue;
        }

        if let Err(err) = cache.put(&base, &document) {
            tracing::warn!(error = %err, "Could not cache schema");
        }
        tracing::info!(url = %url, "Fetched schema");
        return Ok(parse_document(&document, &base));
    }

    match cache.get(&base) {
        Some(document) => {
            tracing::warn!(base_url = %base, "Using cached schema");
            Ok(parse_document(&document, &base))
        }
        None => Err(anyhow!("Could not find an OpenAPI schema at {}", base)),
    }
}

/// Prefix `https://` when no scheme is given and drop trailing slashes
pub fn normalize_base_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Load from a file, a directory containing a spec file, or an http(s) URL
pub async fn load_schema(
    source: &str,
    client: &reqwest::Client,
    cache: &dyn SchemaCache,
) -> Result<ApiSchema> {
    let path = Path::new(source);
    if path.is_file() {
        return load_schema_file(path);
    }
    if path.is_dir() {
        let Some(file) = find_schema_file(path) else {
            bail!("No OpenAPI schema file found in {}", path.display());
        };
        return load_schema_file(&file);
    }
    if source.starts_with("http://") || source.starts_with("https://") {
        return fetch_schema(client, source, cache).await;
    }
    bail!("Schema source not found: {}", source)
}
