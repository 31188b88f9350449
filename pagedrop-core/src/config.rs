//! Store configuration.
//!
//! # Sources (later wins)
//!
//! 1. Built-in defaults (`api_base`, `branch`, retry settings)
//! 2. `<home>/.pagedrop/config.yaml` (optional)
//! 3. `PAGEDROP_*` environment variables
//!
//! # API pattern
//!
//! - `load_at(home)`: explicit home; used in tests with `TempDir`
//! - `load()`: derives home from `dirs::home_dir()`, delegates to `load_at`
//! - `resolve(file, lookup)`: pure; the environment is injected as a closure
//!
//! The resulting [`StoreConfig`] is built once at startup and passed by
//! reference; nothing below the binary reads the environment.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_BASE_DELAY_MS: u64 = 250;

pub const ENV_TOKEN: &str = "PAGEDROP_GITHUB_TOKEN";
pub const ENV_OWNER: &str = "PAGEDROP_OWNER";
pub const ENV_REPO: &str = "PAGEDROP_REPO";
pub const ENV_BRANCH: &str = "PAGEDROP_BRANCH";
pub const ENV_API_BASE: &str = "PAGEDROP_API_BASE";

// ---------------------------------------------------------------------------
// Secret
// ---------------------------------------------------------------------------

/// A credential that never prints its value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Conflict retry tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

/// Everything the remote store client needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub token: Secret,
    pub retry: RetrySettings,
}

// ---------------------------------------------------------------------------
// On-disk file
// ---------------------------------------------------------------------------

/// `config.yaml` payload. Every field is optional; the token is deliberately
/// absent so credentials only come from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub api_base: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub branch: Option<String>,
    pub retry: Option<RetrySettings>,
}

/// `<home>/.pagedrop/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".pagedrop").join("config.yaml")
}

/// Read the config file under `home`; a missing file yields the defaults.
pub fn read_file_at(home: &Path) -> Result<ConfigFile, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Merge defaults, `file`, and `lookup` (an environment accessor).
pub fn resolve<F>(file: ConfigFile, lookup: F) -> Result<StoreConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let api_base = env(ENV_API_BASE)
        .or(file.api_base)
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    let branch = env(ENV_BRANCH)
        .or(file.branch)
        .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
    let owner = env(ENV_OWNER).or(file.owner).ok_or(ConfigError::Missing {
        field: "owner",
        env: ENV_OWNER,
    })?;
    let repo = env(ENV_REPO).or(file.repo).ok_or(ConfigError::Missing {
        field: "repo",
        env: ENV_REPO,
    })?;
    let token = env(ENV_TOKEN).map(Secret::new).ok_or(ConfigError::Missing {
        field: "token",
        env: ENV_TOKEN,
    })?;
    let retry = file.retry.unwrap_or_default();

    if retry.max_attempts == 0 {
        return Err(ConfigError::Invalid {
            field: "retry.max_attempts",
            reason: "must be at least 1".to_string(),
        });
    }
    if !api_base.starts_with("http://") && !api_base.starts_with("https://") {
        return Err(ConfigError::Invalid {
            field: "api_base",
            reason: format!("'{api_base}' is not an http(s) URL"),
        });
    }

    Ok(StoreConfig {
        api_base: api_base.trim_end_matches('/').to_string(),
        owner,
        repo,
        branch,
        token,
        retry,
    })
}

/// Load configuration rooted at `home`, overlaying the process environment.
pub fn load_at(home: &Path) -> Result<StoreConfig, ConfigError> {
    let file = read_file_at(home)?;
    resolve(file, |key| std::env::var(key).ok())
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<StoreConfig, ConfigError> {
    load_at(&home()?)
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
