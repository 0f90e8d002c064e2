//! Persisted controller state.
//!
//! A CLI process lives for a single command, so the in-progress feed and the
//! last connectivity signal are kept in a small JSON file between runs.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::{AppError, FeedTimer, Result};

/// Everything the controller needs to resume where the last command left off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerState {
    #[serde(default)]
    pub timer: FeedTimer,

    /// Last recorded connectivity signal, `None` until one is received.
    #[serde(default)]
    pub online: Option<bool>,
}

impl TrackerState {
    /// Recorded connectivity, falling back to the configured default.
    #[must_use]
    pub fn is_online(&self, default: bool) -> bool {
        self.online.unwrap_or(default)
    }
}

/// JSON file holding the `TrackerState`.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Reads the state; a missing file means a fresh idle timer.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<TrackerState> {
        if !self.path.exists() {
            return Ok(TrackerState::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            AppError::io(format!("Failed to read state file: {}", self.path.display()), e)
        })?;

        serde_json::from_str(&content).map_err(AppError::json_parse)
    }

    /// Like `load`, but an unreadable JSON body is logged and replaced by a
    /// fresh idle state. Only the in-progress feed is lost; the next `save`
    /// overwrites the bad file.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read.
    pub fn load_or_default(&self) -> Result<TrackerState> {
        match self.load() {
            Err(e @ AppError::JsonParse { .. }) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Discarding unreadable tracker state"
                );
                Ok(TrackerState::default())
            }
            other => other,
        }
    }

    /// Writes the state through a temporary file, then renames it into place.
    ///
    /// # Errors
    /// Returns error if the file cannot be written.
    pub fn save(&self, state: &TrackerState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create state directory", e))?;
        }

        let content = serde_json::to_string_pretty(state).map_err(AppError::json_parse)?;
        let tmp = self.path.with_extension("json.tmp");

        fs::write(&tmp, content)
            .map_err(|e| AppError::io(format!("Failed to write {}", tmp.display()), e))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            AppError::io(format!("Failed to replace {}", self.path.display()), e)
        })?;

        tracing::trace!(path = %self.path.display(), "State saved");
        Ok(())
    }
}
