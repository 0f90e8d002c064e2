//! Domain layer - core feeding types and the timer state machine.
//!
//! This layer contains pure domain models and error types
//! without any external dependencies (DB, IO, etc.).

pub mod config;
pub mod error;
pub mod models;
pub mod timer;

pub use config::{AppConfig, TrackerConfig};
pub use error::{AppError, Result};
pub use models::{recent_first, FeedingSession, NewSession, SyncStatus};
pub use timer::{format_elapsed, FeedTimer, Phase, Transition};
