//! Infrastructure layer - external adapters (database, filesystem, terminal).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod config;
pub mod environment;
pub mod local_storage;
pub mod tracker_state;

pub use config::{config_file_path, ensure_config_exists, load_config};
pub use environment::{haptics_for, Clock, Haptics, SystemClock, PULSE};
pub use local_storage::SessionStore;
pub use tracker_state::{StateFile, TrackerState};
