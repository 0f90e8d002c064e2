//! Configuration file management.
//!
//! Handles loading and saving TOML configuration files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppConfig, AppError, Result};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# Feeding Tracker Configuration
# Auto-generated - edit as needed

[tracker]
# Milliliters added or removed by `amount up` / `amount down`
amount_step_ml = 10

# Number of sessions shown by `history`
history_limit = 10

[network]
# Connectivity assumed until `online` or `offline` is recorded
online = true

[feedback]
# Ring the terminal bell as a short haptic pulse on each action
haptics = false

[paths]
# Custom data directory (optional, defaults to ~/.feeding-tracker)
# data_dir = "/custom/path"
"#;

/// Load configuration from the given data directory, or the default one.
///
/// # Errors
/// Returns error if file exists but cannot be read or parsed.
pub fn load_config(data_dir: Option<&Path>) -> Result<AppConfig> {
    let config_path = config_file_path(data_dir);

    let config = if config_path.exists() {
        load_config_from_file(&config_path)?
    } else {
        tracing::debug!(path = %config_path.display(), "No config file, using defaults");
        AppConfig::default()
    };

    Ok(match data_dir {
        Some(dir) => config.with_data_dir(dir.to_path_buf()),
        None => config,
    })
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Create the commented default configuration file if it doesn't exist.
///
/// Returns `true` when a new file was written.
///
/// # Errors
/// Returns error if file cannot be created.
pub fn ensure_config_exists(data_dir: Option<&Path>) -> Result<bool> {
    let config_path = config_file_path(data_dir);

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io("Failed to create config directory", e))?;
    }

    fs::write(&config_path, DEFAULT_CONFIG)
        .map_err(|e| AppError::io("Failed to create default config", e))?;

    tracing::info!(path = %config_path.display(), "Created default configuration");

    Ok(true)
}

/// Get the path to the configuration file.
#[must_use]
pub fn config_file_path(data_dir: Option<&Path>) -> PathBuf {
    data_dir
        .map_or_else(AppConfig::default_data_dir, Path::to_path_buf)
        .join("config.toml")
}
