//! Configuration for rundock.
//!
//! Settings are read from `.rundock/rundock.toml` in the project directory,
//! layered as: user config (`~/.config/rundock/rundock.toml`) → project file
//! → environment → CLI. Missing files contribute nothing.
//!
//! # Configuration File Format
//!
//! ```toml
//! [host]
//! url = "http://127.0.0.1:4000"
//! request_timeout_secs = 30
//! poll_interval_ms = 500
//!
//! [timing]
//! sleep_after_open_project = 4.0
//! sleep_between_rounds = 270.0
//!
//! [history]
//! max_entries = 500
//!
//! [logging]
//! format = "pretty"
//! dir = ".rundock/logs"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;
use crate::history::DEFAULT_MAX_ENTRIES;
use crate::run::types::Timing;

/// Directory holding project-level state.
pub const RUNDOCK_DIR: &str = ".rundock";
pub const CONFIG_FILE: &str = "rundock.toml";

/// Environment variable overriding `host.url`.
pub const HOST_URL_ENV: &str = "RUNDOCK_HOST_URL";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines (default)
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::InvalidValue {
                key: "logging.format".to_string(),
                message: format!("'{}' is not one of: pretty, json", s),
            }),
        }
    }
}

/// Process host connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Base URL of the HTTP host
    #[serde(default = "default_host_url")]
    pub url: String,
    /// Per-request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Delay between event polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_host_url() -> String {
    "http://127.0.0.1:4000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            url: default_host_url(),
            request_timeout_secs: default_request_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Archived runs kept in memory
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Directory for daily log files; relative paths resolve against the project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Contents of `rundock.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RundockToml {
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Recursively overlay `overlay` onto `base`; tables merge, other values replace.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn read_table(path: &Path) -> Result<Option<toml::Table>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let table = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(table))
}

impl RundockToml {
    /// Load a single configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_layers(&[path.to_path_buf()])
    }

    /// Merge files in order, later files winning key by key.
    pub fn load_layers(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut merged = toml::Table::new();
        let mut last_path = PathBuf::new();
        for path in paths {
            if let Some(table) = read_table(path)? {
                merge_tables(&mut merged, table);
                last_path = path.clone();
            }
        }
        toml::Value::Table(merged)
            .try_into()
            .map_err(|source| ConfigError::Parse {
                path: last_path,
                source,
            })
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from(CONFIG_FILE),
            source,
        })
    }

    /// Load `.rundock/rundock.toml` under `rundock_dir`, or defaults if absent.
    pub fn load_or_default(rundock_dir: &Path) -> Result<Self, ConfigError> {
        Self::load(&rundock_dir.join(CONFIG_FILE))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(HOST_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.host.url = url;
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let url = self.host.url.trim();
        if url.is_empty() {
            warnings.push("host.url is empty".to_string());
        } else if !(url.starts_with("http://") || url.starts_with("https://")) {
            warnings.push(format!("host.url '{}' should start with http:// or https://", url));
        }
        if self.host.request_timeout_secs == 0 {
            warnings
                .push("host.request_timeout_secs is 0; every request will time out".to_string());
        }
        if self.host.poll_interval_ms == 0 {
            warnings.push("host.poll_interval_ms is 0; event polling will spin".to_string());
        }
        for (name, value) in self.timing.entries() {
            if !value.is_finite() || value < 0.0 {
                warnings.push(format!(
                    "timing.{} must be a non-negative number, got {}",
                    name, value
                ));
            }
        }
        if self.history.max_entries == 0 {
            warnings
                .push("history.max_entries is 0; at least one entry is always kept".to_string());
        }

        warnings
    }
}

/// Path of the user-level config file, if a config directory exists.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rundock").join(CONFIG_FILE))
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct RundockConfig {
    pub project_dir: PathBuf,
    pub rundock_dir: PathBuf,
    pub toml: RundockToml,
    /// CLI override: verbose logging
    pub verbose: bool,
}

impl RundockConfig {
    /// Load config for `project_dir` from the user file, the project file and the environment.
    pub fn new(project_dir: PathBuf) -> Result<Self, ConfigError> {
        let rundock_dir = project_dir.join(RUNDOCK_DIR);
        let mut layers: Vec<PathBuf> = global_config_path().into_iter().collect();
        layers.push(rundock_dir.join(CONFIG_FILE));

        let mut toml = RundockToml::load_layers(&layers)?;
        toml.apply_env_with(|key| std::env::var(key).ok());

        Ok(Self {
            project_dir,
            rundock_dir,
            toml,
            verbose: false,
        })
    }

    /// Load config and apply CLI overrides.
    pub fn with_cli_args(
        project_dir: PathBuf,
        verbose: bool,
        host_url: Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        if let Some(url) = host_url {
            config.toml.host.url = url;
        }
        Ok(config)
    }

    pub fn config_file(&self) -> PathBuf {
        self.rundock_dir.join(CONFIG_FILE)
    }

    /// Log directory, resolved against the project directory.
    pub fn log_dir(&self) -> Option<PathBuf> {
        self.toml.logging.dir.as_ref().map(|dir| {
            if dir.is_absolute() {
                dir.clone()
            } else {
                self.project_dir.join(dir)
            }
        })
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
