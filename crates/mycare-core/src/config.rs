//! Configuration module for MyCare.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Server used when no configuration file overrides it.
pub const DEFAULT_BASE_URL: &str = "http://192.168.1.8:5001";

/// Top-level configuration for MyCare.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub downloads: DownloadsConfig,
    pub logging: LoggingConfig,
}

/// MyCare server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the MyCare REST server, e.g. `https://api.mycare.app`.
    pub base_url: String,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

/// Where and how shared files are saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadsConfig {
    /// Directory downloaded files are written to. A leading `~` is expanded.
    pub directory: PathBuf,
    /// Open the raw download URL in the browser when the authenticated
    /// fetch fails.
    pub open_fallback: bool,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path`, or [`Config::default`] when no file exists there.
    ///
    /// A file that exists but cannot be read or parsed is an error, so a
    /// typo never silently turns into the default server.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))
    }

    /// Write the configuration as YAML to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/mycare/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("mycare")
            .join("config.yaml")
    }

    /// Download directory with a leading `~` replaced by the home directory.
    pub fn download_dir(&self) -> PathBuf {
        expand_home(&self.downloads.directory)
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: concat!("mycare-cli/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("~/Downloads/MyCare"),
            open_fallback: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"api.base_url"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- api ---
        match url::Url::parse(&self.api.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                if url.host_str().is_none() {
                    errors.push(ValidationError {
                        field: "api.base_url".into(),
                        message: "must include a host".into(),
                    });
                }
            }
            Ok(url) => errors.push(ValidationError {
                field: "api.base_url".into(),
                message: format!("unsupported scheme '{}', expected http or https", url.scheme()),
            }),
            Err(e) => errors.push(ValidationError {
                field: "api.base_url".into(),
                message: format!("invalid URL: {e}"),
            }),
        }
        if self.api.user_agent.trim().is_empty() {
            errors.push(ValidationError {
                field: "api.user_agent".into(),
                message: "must not be empty".into(),
            });
        }

        // --- downloads ---
        if self.downloads.directory.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "downloads.directory".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use mycare_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .api_base_url("https://api.mycare.app")
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Start from an existing configuration, e.g. one loaded from disk.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    // --- api ---

    pub fn api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.api.base_url = base_url.into();
        self
    }

    pub fn api_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.api.user_agent = user_agent.into();
        self
    }

    // --- downloads ---

    pub fn downloads_directory(mut self, directory: PathBuf) -> Self {
        self.config.downloads.directory = directory;
        self
    }

    pub fn downloads_open_fallback(mut self, enabled: bool) -> Self {
        self.config.downloads.open_fallback = enabled;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
