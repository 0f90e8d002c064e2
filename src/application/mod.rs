//! Application layer - use cases and orchestration.
//!
//! This layer contains the feeding controller, the sync routine and the
//! output formatting.

pub mod controller;
pub mod formatter;
pub mod sync_service;

pub use controller::{FeedingController, SaveOutcome};
pub use formatter::{
    connectivity_label, format_history, format_notice, format_status, format_sync_report,
    OutputFormat, StatusView,
};
pub use sync_service::{LocalOnlySync, RemoteSync};
