//! Configuration management for archive-search
//!
//! Loads the TOML configuration, applies `ARCHIVE_SEARCH_<SECTION>__<KEY>`
//! environment overrides and validates the result.

use crate::error::{ArchiveError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

pub const SCHEMA_VERSION: &str = "1.0.0";

const ENV_PREFIX: &str = "ARCHIVE_SEARCH_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub justification: JustificationConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Archive API endpoints and paging
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub search_endpoint: String,
    pub count_endpoint: String,
    pub resources_endpoint: String,
    /// List node lookup, e.g. season labels
    pub node_endpoint: String,
    pub lists_endpoint: String,
    /// Root node of the subject vocabulary
    pub subject_list_id: String,
    /// Results per backend page, fixed by the API
    pub page_size: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            search_endpoint: "https://api.dasch.swiss/v2/searchextended".to_string(),
            count_endpoint: "https://api.dasch.swiss/v2/searchextended/count".to_string(),
            resources_endpoint: "https://api.dasch.swiss/v2/resources".to_string(),
            node_endpoint: "https://api.dasch.swiss/v2/node".to_string(),
            lists_endpoint: "https://api.dasch.swiss/v2/lists".to_string(),
            subject_list_id: "http://rdfh.ch/lists/0804/w5dBw8W1TymqNHZQ3dq3wQ".to_string(),
            page_size: 25,
        }
    }
}

/// Search session timing and batch size
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Debounce delay before a changed query is committed
    pub search_delay_ms: u64,
    /// Ids fetched per batch
    pub api_paging: usize,
    /// Longest wait for the fetch lock before a fetch is abandoned
    pub lock_timeout_ms: u64,
}

impl SessionConfig {
    pub fn search_delay(&self) -> Duration {
        Duration::from_millis(self.search_delay_ms)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            search_delay_ms: 300,
            api_paging: 25,
            lock_timeout_ms: 5000,
        }
    }
}

/// Excerpt rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JustificationConfig {
    /// Minimum number of characters shown on each side of a match
    pub context_length: usize,
    /// Only end the context at whitespace
    pub require_whitespace: bool,
    /// Stop the context at `.`, `?` and `!`
    pub respect_hard_break: bool,
    /// Inline style of the highlighted match
    pub match_style: String,
    /// Text around a `.`, `?` or `!` that does not end a sentence, e.g. `"St. "`
    pub hard_break_exceptions: Vec<String>,
}

impl Default for JustificationConfig {
    fn default() -> Self {
        Self {
            context_length: 40,
            require_whitespace: true,
            respect_hard_break: true,
            match_style: "background: lightgreen; font-weight: bold;".to_string(),
            hard_break_exceptions: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ArchiveError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ArchiveError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        // Validate configuration
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ArchiveError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", parent),
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ArchiveError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: ARCHIVE_SEARCH_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::vars());
    }

    fn apply_overrides(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "BACKEND__SEARCH_ENDPOINT" => self.backend.search_endpoint = value.to_string(),
            "BACKEND__COUNT_ENDPOINT" => self.backend.count_endpoint = value.to_string(),
            "BACKEND__RESOURCES_ENDPOINT" => self.backend.resources_endpoint = value.to_string(),
            "BACKEND__NODE_ENDPOINT" => self.backend.node_endpoint = value.to_string(),
            "BACKEND__LISTS_ENDPOINT" => self.backend.lists_endpoint = value.to_string(),
            "BACKEND__SUBJECT_LIST_ID" => self.backend.subject_list_id = value.to_string(),
            "BACKEND__PAGE_SIZE" => self.backend.page_size = parse_env(path, value)?,
            "SESSION__SEARCH_DELAY_MS" => self.session.search_delay_ms = parse_env(path, value)?,
            "SESSION__API_PAGING" => self.session.api_paging = parse_env(path, value)?,
            "SESSION__LOCK_TIMEOUT_MS" => self.session.lock_timeout_ms = parse_env(path, value)?,
            "JUSTIFICATION__CONTEXT_LENGTH" => {
                self.justification.context_length = parse_env(path, value)?
            }
            "JUSTIFICATION__REQUIRE_WHITESPACE" => {
                self.justification.require_whitespace = parse_env(path, value)?
            }
            "JUSTIFICATION__RESPECT_HARD_BREAK" => {
                self.justification.respect_hard_break = parse_env(path, value)?
            }
            "JUSTIFICATION__MATCH_STYLE" => self.justification.match_style = value.to_string(),
            // Comma separated; whitespace is part of an exception
            "JUSTIFICATION__HARD_BREAK_EXCEPTIONS" => {
                self.justification.hard_break_exceptions = value
                    .split(',')
                    .filter(|e| !e.is_empty())
                    .map(str::to_string)
                    .collect()
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ArchiveError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("archive-search").join("config.toml"))
    }
}

fn parse_env<T: FromStr>(path: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ArchiveError::InvalidConfigValue {
            path: path.to_string(),
            message: format!("Cannot parse '{}'", value),
        })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            backend: BackendConfig::default(),
            session: SessionConfig::default(),
            justification: JustificationConfig::default(),
        }
    }
}
