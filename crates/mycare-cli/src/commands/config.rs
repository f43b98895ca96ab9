//! Config command - View and manage MyCare configuration
//!
//! Provides the `mycare config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use mycare_core::config::Config;

use crate::output::{get_formatter, OutputFormat};

/// Keys accepted by `mycare config set`, with a short description
const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("api.base_url", "Server base URL (http or https)"),
    ("api.user_agent", "User-Agent sent with every request"),
    ("downloads.directory", "Where downloaded files are saved"),
    ("downloads.open_fallback", "true|false, open the URL when a download fails"),
    ("logging.level", "trace|debug|info|warn|error"),
];

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "api.base_url")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    /// Execute the config command against the file at `config_path`
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(format, config_path),
            ConfigCommand::Set { key, value } => execute_set(key, value, format, config_path),
            ConfigCommand::Validate => execute_validate(format, config_path),
        }
    }
}

fn execute_show(format: OutputFormat, config_path: &Path) -> Result<()> {
    let formatter = get_formatter(format, false);
    let config = match Config::load_or_default(config_path) {
        Ok(config) => config,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            return Err(e);
        }
    };

    info!(config_path = %config_path.display(), "Showing configuration");

    if format.is_json() {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", config_path.display()));
        formatter.info("");

        let yaml =
            serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
    }

    Ok(())
}

fn execute_set(key: &str, value: &str, format: OutputFormat, config_path: &Path) -> Result<()> {
    let formatter = get_formatter(format, false);
    // Never rewrite a file that failed to parse with defaults
    let mut config = match Config::load_or_default(config_path) {
        Ok(config) => config,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            formatter.info("Fix the file or run 'mycare config validate' for details.");
            return Err(e);
        }
    };

    info!(key = %key, "Setting configuration value");

    if let Err(e) = apply_config_value(&mut config, key, value) {
        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": false,
                "key": key,
                "value": value,
                "error": e.to_string(),
            }));
        } else {
            formatter.error(&format!("Failed to set '{}': {}", key, e));
            formatter.info("");
            formatter.info("Supported keys:");
            for (name, description) in SUPPORTED_KEYS {
                formatter.info(&format!("  {name:<26} - {description}"));
            }
        }
        return Ok(());
    }

    let errors = config.validate();
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": false,
                "key": key,
                "value": value,
                "errors": messages,
            }));
        } else {
            formatter.error(&format!(
                "Invalid value for '{}': {}",
                key,
                messages.join("; ")
            ));
        }
        return Ok(());
    }

    config
        .save(config_path)
        .context("Failed to write configuration file")?;

    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "key": key,
            "value": value,
            "config_path": config_path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Set {} = {}", key, value));
        formatter.info(&format!("Saved to {}", config_path.display()));
    }

    Ok(())
}

fn execute_validate(format: OutputFormat, config_path: &Path) -> Result<()> {
    let formatter = get_formatter(format, false);

    let config = match Config::load(config_path) {
        Ok(cfg) => cfg,
        Err(_) if !config_path.exists() => {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "valid": true,
                    "config_path": config_path.display().to_string(),
                    "errors": [],
                    "using_defaults": true,
                }));
            } else {
                formatter.info(&format!(
                    "Configuration file not found at {}",
                    config_path.display()
                ));
                formatter.info(
                    "Using default configuration. Run 'mycare config set <key> <value>' to create one.",
                );
            }
            return Ok(());
        }
        Err(e) => {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "valid": false,
                    "config_path": config_path.display().to_string(),
                    "errors": [format!("Failed to parse configuration: {}", e)],
                }));
            } else {
                formatter.error(&format!("Failed to parse configuration: {}", e));
                formatter.info(&format!("File: {}", config_path.display()));
            }
            return Ok(());
        }
    };

    info!(config_path = %config_path.display(), "Validating configuration");

    let errors = config.validate();

    if format.is_json() {
        let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": config_path.display().to_string(),
            "errors": error_strings,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", config_path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        formatter.info(&format!("File: {}", config_path.display()));
        formatter.info("");
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }

    Ok(())
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- api ---
        "api.base_url" => {
            config.api.base_url = value.trim_end_matches('/').to_string();
        }
        "api.user_agent" => {
            config.api.user_agent = value.to_string();
        }

        // --- downloads ---
        "downloads.directory" => {
            config.downloads.directory = PathBuf::from(value);
        }
        "downloads.open_fallback" => {
            config.downloads.open_fallback = value
                .parse::<bool>()
                .context("Expected true or false for downloads.open_fallback")?;
        }

        // --- logging ---
        "logging.level" => {
            config.logging.level = value.to_ascii_lowercase();
        }

        _ => {
            anyhow::bail!("Unknown configuration key: '{}'", key);
        }
    }

    Ok(())
}
