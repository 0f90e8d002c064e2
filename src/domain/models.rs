//! Domain models for recorded feeding sessions.
//!
//! A session is created once, when a completed feed is saved, and afterwards
//! only its sync status may change.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::error::{AppError, Result};

/// Whether a session has been reconciled with the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Saved while offline, waiting for the next sync run.
    Pending,
    /// Saved while online or flipped by the sync routine.
    Synced,
}

impl SyncStatus {
    /// Status a new session gets for the given connectivity.
    #[must_use]
    pub const fn for_connectivity(online: bool) -> Self {
        if online {
            Self::Synced
        } else {
            Self::Pending
        }
    }

    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "synced" => Ok(Self::Synced),
            other => Err(AppError::InvalidData {
                message: format!("Unknown sync status: {other}"),
            }),
        }
    }
}

/// A completed feed that has not been written to the store yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    amount_ml: u32,
    sync_status: SyncStatus,
}

impl NewSession {
    /// Builds a session, rejecting an end time before the start time.
    /// Timestamps are truncated to the millisecond precision the store keeps.
    ///
    /// # Errors
    /// Returns `InvalidData` if `end_time < start_time`.
    pub fn new(
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        amount_ml: u32,
        sync_status: SyncStatus,
    ) -> Result<Self> {
        let start_time = start_time.trunc_subsecs(3);
        let end_time = end_time.trunc_subsecs(3);

        if end_time < start_time {
            return Err(AppError::InvalidData {
                message: format!(
                    "Feed ends ({}) before it starts ({})",
                    end_time.to_rfc3339(),
                    start_time.to_rfc3339()
                ),
            });
        }

        Ok(Self {
            start_time,
            end_time,
            amount_ml,
            sync_status,
        })
    }

    #[must_use]
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    #[must_use]
    pub const fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    #[must_use]
    pub const fn amount_ml(&self) -> u32 {
        self.amount_ml
    }

    #[must_use]
    pub const fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    /// Feed length in milliseconds, always `end_time - start_time`.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.end_time - self.start_time).num_milliseconds()
    }

    /// Attaches the store-assigned id.
    #[must_use]
    pub fn with_id(self, id: i64) -> FeedingSession {
        FeedingSession {
            id,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_ms: self.duration_ms(),
            amount_ml: self.amount_ml,
            sync_status: self.sync_status,
        }
    }
}

/// A feeding session as persisted by the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedingSession {
    /// Store-assigned identifier, never reused.
    pub id: i64,
    /// When the feed started.
    pub start_time: DateTime<Utc>,
    /// When the feed was saved.
    pub end_time: DateTime<Utc>,
    /// `end_time - start_time` in milliseconds.
    #[serde(rename = "duration")]
    pub duration_ms: i64,
    /// Milk volume in milliliters.
    #[serde(rename = "amount")]
    pub amount_ml: u32,
    /// Local sync flag.
    pub sync_status: SyncStatus,
}

impl FeedingSession {
    /// Duration rounded down to whole minutes.
    #[must_use]
    pub const fn whole_minutes(&self) -> i64 {
        self.duration_ms / 60_000
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.sync_status == SyncStatus::Pending
    }

    /// Copy of this session marked as synced.
    #[must_use]
    pub fn synced(mut self) -> Self {
        self.sync_status = SyncStatus::Synced;
        self
    }
}

/// Sorts newest first by start time and keeps at most `limit` sessions.
#[must_use]
pub fn recent_first(mut sessions: Vec<FeedingSession>, limit: usize) -> Vec<FeedingSession> {
    sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    sessions.truncate(limit);
    sessions
}
