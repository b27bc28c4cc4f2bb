//! Runtime configuration resolved from the environment

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    APP_DIR_NAME, DEFAULT_ENVIRONMENT, DEFAULT_HISTORY_LIMIT, DEFAULT_TIMEOUT_SECS, HOME_ENV,
    LOG_FILE_NAME, TIMEOUT_ENV,
};

/// Where files live and how requests behave
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory holding collections, environments, history, schema cache and logs
    pub home: PathBuf,
    pub timeout: Duration,
    pub history_limit: usize,
    pub default_env: String,
}

impl Config {
    /// Resolve configuration: `SEXTANT_HOME`, then `~/.sextant`, then `./.sextant`
    pub fn load() -> Self {
        let home = env::var_os(HOME_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(APP_DIR_NAME)
            });

        let timeout_secs = env::var(TIMEOUT_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Config::with_home(home).timeout(Duration::from_secs(timeout_secs))
    }

    /// Configuration rooted at an explicit directory, with default settings
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Config {
            home: home.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            history_limit: DEFAULT_HISTORY_LIMIT,
            default_env: String::from(DEFAULT_ENVIRONMENT),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn collections_file(&self) -> PathBuf {
        self.home.join("collections.yaml")
    }

    pub fn environments_file(&self) -> PathBuf {
        self.home.join("envs.yaml")
    }

    pub fn history_file(&self) -> PathBuf {
        self.home.join("history.log")
    }

    pub fn schema_cache_dir(&self) -> PathBuf {
        self.home.join("schema_cache")
    }

    pub fn log_dir(&self) -> &Path {
        &self.home
    }

    pub fn log_file(&self) -> PathBuf {
        self.home.join(LOG_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_rooted_at_home() {
        let config = Config::with_home("/tmp/sextant-test");
        assert_eq!(config.collections_file(), Path::new("/tmp/sextant-test/collections.yaml"));
        assert_eq!(config.environments_file(), Path::new("/tmp/sextant-test/envs.yaml"));
        assert_eq!(config.history_file(), Path::new("/tmp/sextant-test/history.log"));
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.default_env, "default");
    }
}
