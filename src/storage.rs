//! Collections, environments and history on disk

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Config;
use crate::constants::DEFAULT_ENVIRONMENT;
use crate::models::{Collection, Environment, HistoryEntry, Request};

/// Manages request history and file storage
pub struct Storage {
    config_dir: PathBuf,
    collections_file: PathBuf,
    environments_file: PathBuf,
    history_file: PathBuf,
}

impl Storage {
    /// Open storage under the configured directory, creating it and a
    /// `default` environment on first use
    pub fn open(config: &Config) -> Result<Self> {
        let storage = Storage {
            config_dir: config.home.clone(),
            collections_file: config.collections_file(),
            environments_file: config.environments_file(),
            history_file: config.history_file(),
        };
        storage.ensure_dir()?;

        if !storage.environments_file.exists() {
            storage.save_environment(&Environment::new(DEFAULT_ENVIRONMENT))?;
        }

        Ok(storage)
    }

    /// Ensure config directory exists
    fn ensure_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            fs::create_dir_all(&self.config_dir)
                .with_context(|| format!("Failed to create {}", self.config_dir.display()))?;
        }
        Ok(())
    }

    /// Save a request into a collection, creating the collection if needed
    pub fn save_request(&self, name: &str, request: &Request, collection: &str) -> Result<()> {
        let mut collections = self.load_collections()?;
        collections
            .entry(collection.to_string())
            .or_insert_with(|| Collection::new(collection))
            .requests
            .insert(name.to_string(), request.clone());
        self.write_collections(&collections)?;
        tracing::info!(name, collection, "Saved request");
        Ok(())
    }

    pub fn load_request(&self, name: &str, collection: &str) -> Result<Option<Request>> {
        let collections = self.load_collections()?;
        Ok(collections
            .get(collection)
            .and_then(|c| c.requests.get(name))
            .cloned())
    }

    /// Remove a request; `false` when it did not exist
    pub fn delete_request(&self, name: &str, collection: &str) -> Result<bool> {
        let mut collections = self.load_collections()?;
        let removed = collections
            .get_mut(collection)
            .and_then(|c| c.requests.shift_remove(name))
            .is_some();
        if removed {
            self.write_collections(&collections)?;
        }
        Ok(removed)
    }

    /// All collections keyed by name, in file order
    pub fn load_collections(&self) -> Result<IndexMap<String, Collection>> {
        let mut collections: IndexMap<String, Collection> = read_yaml(&self.collections_file)?;
        for (name, collection) in collections.iter_mut() {
            collection.name = name.clone();
        }
        Ok(collections)
    }

    pub fn delete_collection(&self, name: &str) -> Result<bool> {
        let mut collections = self.load_collections()?;
        let removed = collections.shift_remove(name).is_some();
        if removed {
            self.write_collections(&collections)?;
        }
        Ok(removed)
    }

    fn write_collections(&self, collections: &IndexMap<String, Collection>) -> Result<()> {
        write_yaml(&self.collections_file, collections)
    }

    /// Save an environment, replacing one with the same name
    pub fn save_environment(&self, environment: &Environment) -> Result<()> {
        let mut environments = self.load_environments()?;
        environments.insert(environment.name.clone(), environment.clone());
        write_yaml(&self.environments_file, &environments)
    }

    pub fn load_environment(&self, name: &str) -> Result<Option<Environment>> {
        Ok(self.load_environments()?.shift_remove(name))
    }

    pub fn load_environments(&self) -> Result<IndexMap<String, Environment>> {
        let mut environments: IndexMap<String, Environment> = read_yaml(&self.environments_file)?;
        for (name, environment) in environments.iter_mut() {
            environment.name = name.clone();
        }
        Ok(environments)
    }

    /// Set one variable, creating the environment if needed
    pub fn set_variable(&self, environment: &str, key: &str, value: &str) -> Result<()> {
        let mut env = self
            .load_environment(environment)?
            .unwrap_or_else(|| Environment::new(environment));
        env.set(key, value);
        self.save_environment(&env)
    }

    /// Resolve `{{variable}}` references using a stored environment
    pub fn resolve_variables(&self, text: &str, environment: &str) -> Result<String> {
        Ok(match self.load_environment(environment)? {
            Some(env) => env.substitute(text),
            None => text.to_string(),
        })
    }

    /// Append an entry to the JSON-lines history file
    pub fn add_to_history(&self, entry: &HistoryEntry) -> Result<()> {
        self.ensure_dir()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.history_file)
            .with_context(|| format!("Failed to open {}", self.history_file.display()))?;
        writeln!(file, "{}", serde_json::to_string(entry)?)?;
        Ok(())
    }

    /// Up to `limit` most recent entries, newest first. Unreadable lines are skipped.
    pub fn load_history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        if !self.history_file.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.history_file)
            .with_context(|| format!("Failed to read {}", self.history_file.display()))?;

        let mut entries = Vec::new();
        for line in content.lines().rev().filter(|l| !l.trim().is_empty()) {
            if entries.len() >= limit {
                break;
            }
            match serde_json::from_str::<HistoryEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(err) => tracing::warn!(error = %err, "Skipping unreadable history line"),
            }
        }
        Ok(entries)
    }
}

fn read_yaml<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(&content).with_context(|| format!("Invalid YAML in {}", path.display()))
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_yaml::to_string(value)?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
