//! Application configuration.
//!
//! Every section falls back to its defaults when missing from the file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Timer and history behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Step used by the `amount up` / `amount down` buttons, in milliliters.
    #[serde(default = "default_amount_step")]
    pub amount_step_ml: u32,

    /// Number of sessions shown in the history.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            amount_step_ml: default_amount_step(),
            history_limit: default_history_limit(),
        }
    }
}

const fn default_amount_step() -> u32 {
    10
}

const fn default_history_limit() -> usize {
    10
}

/// Connectivity defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Connectivity assumed before any `online`/`offline` signal was recorded.
    #[serde(default = "default_online")]
    pub online: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            online: default_online(),
        }
    }
}

const fn default_online() -> bool {
    true
}

/// User feedback on actions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Emit a short haptic pulse (terminal bell) on button presses.
    #[serde(default)]
    pub haptics: bool,
}

/// Path configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathConfig {
    /// Base data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub tracker: TrackerConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub feedback: FeedbackConfig,

    #[serde(default)]
    pub paths: PathConfig,
}

impl AppConfig {
    /// Get the data directory, using default if not configured.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.paths
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".feeding-tracker")
    }

    /// Session database path.
    #[must_use]
    pub fn storage_db_path(&self) -> PathBuf {
        self.data_dir().join("feedings.db")
    }

    /// Persisted controller state path.
    #[must_use]
    pub fn state_file_path(&self) -> PathBuf {
        self.data_dir().join("tracker.json")
    }

    /// Same configuration rooted at another data directory.
    #[must_use]
    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        self.paths.data_dir = Some(data_dir);
        self
    }
}
