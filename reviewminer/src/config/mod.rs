//! Configuration management for reviewminer
//!
//! Default config location: ~/.reviewminer/config.toml

mod credentials;

pub use credentials::Credentials;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::discovery::{CollectionRef, QueryTarget, TargetTable};
use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// Environment/collection bindings per query target
    #[serde(default)]
    pub targets: TargetsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    /// Service base URL. Override with DISCOVERY_URL env var
    #[serde(default = "default_url")]
    pub url: String,
    /// API version date sent as `version` on every request
    #[serde(default = "default_version_date")]
    pub version_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// JSON file with `{"username": .., "password": ..}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_url() -> String {
    "https://gateway.watsonplatform.net/discovery/api".to_string()
}

fn default_version_date() -> String {
    "2016-12-15".to_string()
}

fn default_request_timeout() -> u64 {
    30000
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            version_date: default_version_date(),
            username: None,
            password: None,
            credentials_file: None,
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl DiscoveryConfig {
    /// Resolve credentials.
    ///
    /// Resolution order:
    /// 1. `username` + `password` in this section
    /// 2. `credentials_file`
    /// 3. `DISCOVERY_USERNAME` / `DISCOVERY_PASSWORD` env vars
    ///
    /// Returns `None` when nothing is configured (unauthenticated requests).
    pub fn credentials(&self) -> Result<Option<Credentials>> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                return Ok(Some(Credentials::new(username, password)));
            }
            (None, None) => {}
            _ => {
                return Err(Error::Config(
                    "discovery.username and discovery.password must be set together".to_string(),
                ))
            }
        }

        if let Some(path) = &self.credentials_file {
            return Credentials::from_file(&expand_tilde(path)?).map(Some);
        }

        Ok(Credentials::from_env())
    }
}

/// Query target bindings.
///
/// An absent `[targets]` section falls back to the deployment defaults; a
/// present section must bind every target or table construction fails.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news: Option<CollectionRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<CollectionRef>,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            news: Some(CollectionRef::new(
                "1fbb19e5-8f49-4a25-bf3d-77c56a343396",
                "231e6d6c-dfb6-47eb-b61e-1252ab24404a",
            )),
            reviews: Some(CollectionRef::new(
                "4bca73f7-4e8d-4536-92e5-b1c1ef46bcb0",
                "231e6d6c-dfb6-47eb-b61e-1252ab24404a",
            )),
        }
    }
}

impl TargetsConfig {
    pub fn bindings(&self) -> BTreeMap<QueryTarget, CollectionRef> {
        let mut bindings = BTreeMap::new();
        if let Some(news) = &self.news {
            bindings.insert(QueryTarget::News, news.clone());
        }
        if let Some(reviews) = &self.reviews {
            bindings.insert(QueryTarget::Reviews, reviews.clone());
        }
        bindings
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter string
    /// Override with RUST_LOG env var
    #[serde(default = "default_level")]
    pub level: String,
    /// Log output format: "pretty" or "json"
    /// Override with LOG_FORMAT env var
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_level() -> String {
    "info,reviewminer=debug".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

/// Expand ~ to home directory in path
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(rest))
    } else if s == "~" {
        dirs::home_dir().ok_or_else(|| Error::Config("Cannot determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

/// ~/.reviewminer/config.toml
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".reviewminer")
        .join("config.toml")
}

impl Config {
    /// Load config from default location (~/.reviewminer/config.toml)
    pub fn load() -> Result<Self> {
        Self::load_from(&default_config_path())
    }

    /// Load config from a file, falling back to defaults when it does not exist.
    /// Environment overrides are applied on top.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut config = if config_path.exists() {
            let content = fs::read_to_string(config_path)?;
            toml::from_str(&content)?
        } else {
            tracing::debug!(path = %config_path.display(), "No config file, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(config_path, content)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DISCOVERY_URL") {
            self.discovery.url = url;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Build the read-only target table; every target must be bound.
    pub fn target_table(&self) -> Result<TargetTable> {
        TargetTable::new(self.targets.bindings())
    }
}
