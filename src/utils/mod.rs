//! Utility modules for error handling, configuration and paths

pub mod clipboard;
pub mod config;
pub mod error;
pub mod paths;

// Re-export for convenience
pub use config::{ApiMode, AppSettings};
pub use error::{Result, YtSaveError};
pub use paths::{get_app_support_dir, get_database_path, get_downloads_dir, get_settings_path};
