//! Platform path resolution
//!
//! All paths are resolved from platform conventions via `dirs`, never relative to
//! the current working directory:
//! - App data: `<data dir>/YTSave/` (settings and the session database)
//! - Downloads: the platform Downloads directory

use std::path::PathBuf;
use tracing::{debug, warn};

/// Get the application data directory for YTSave.
///
/// Creates the directory if it doesn't exist.
pub fn get_app_support_dir() -> PathBuf {
    let dir = dirs::data_dir()
        .map(|data| data.join("YTSave"))
        .or_else(|| dirs::home_dir().map(|home| home.join(".ytsave")))
        .unwrap_or_else(|| std::env::temp_dir().join("YTSave"));

    if let Err(e) = std::fs::create_dir_all(&dir) {
        warn!("Failed to create app data directory {:?}: {}", dir, e);
    }

    debug!("App data directory: {:?}", dir);
    dir
}

/// Get the session database path
pub fn get_database_path() -> PathBuf {
    get_app_support_dir().join("ytsave.db")
}

/// Get the settings file path
pub fn get_settings_path() -> PathBuf {
    get_app_support_dir().join("settings.json")
}

/// Get the downloads directory.
///
/// Falls back to ~/Downloads, then to the temp dir.
pub fn get_downloads_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| {
            warn!("Could not determine Downloads directory, using temp dir");
            std::env::temp_dir()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_support_dir_is_not_relative() {
        let path = get_app_support_dir();
        assert!(path.is_absolute(), "App data dir must be absolute path");
    }

    #[test]
    fn test_database_path_is_not_relative() {
        let path = get_database_path();
        assert!(path.is_absolute(), "Database path must be absolute path");
        assert!(path.to_string_lossy().ends_with("ytsave.db"));
    }

    #[test]
    fn test_settings_path_lives_next_to_database() {
        assert_eq!(get_settings_path().parent(), get_database_path().parent());
    }

    #[test]
    fn test_downloads_dir_is_not_relative() {
        assert!(get_downloads_dir().is_absolute());
    }
}
