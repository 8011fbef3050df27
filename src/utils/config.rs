//! Application configuration

use crate::utils::error::Result;
use crate::utils::paths::{get_downloads_dir, get_settings_path};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable carrying an injected API key
pub const ENV_API_KEY: &str = "YTSAVE_API_KEY";
/// Environment variable overriding the API base URL
pub const ENV_API_BASE: &str = "YTSAVE_API_BASE";
/// Environment variable overriding the API mode
pub const ENV_API_MODE: &str = "YTSAVE_API_MODE";

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Which remote service resolves formats and stream URLs
    pub api_mode: ApiMode,

    /// Base URL of the self-hosted API or the backend
    pub api_base_url: String,

    /// Base URL of the oEmbed metadata service
    pub oembed_base_url: String,

    /// Base URL used to build watch-page links
    pub watch_base_url: String,

    /// Download location
    pub download_location: PathBuf,

    /// Extension appended to downloaded files
    pub file_extension: String,

    /// Injected credential. Never written back to the settings file.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_mode: ApiMode::SelfHosted,
            api_base_url: "http://localhost:8000".to_string(),
            oembed_base_url: "https://www.youtube.com".to_string(),
            watch_base_url: "https://www.youtube.com".to_string(),
            download_location: get_downloads_dir(),
            file_extension: "mp4".to_string(),
            api_key: None,
        }
    }
}

impl AppSettings {
    /// Load settings from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut settings = Self::load_from(&get_settings_path())?;
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Load settings from a JSON file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Write settings as pretty JSON
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup (the process environment in practice)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key.trim().to_string());
        }
        if let Some(base) = lookup(ENV_API_BASE).filter(|b| !b.trim().is_empty()) {
            self.api_base_url = base.trim().trim_end_matches('/').to_string();
        }
        if let Some(mode) = lookup(ENV_API_MODE) {
            match ApiMode::parse(&mode) {
                Some(parsed) => self.api_mode = parsed,
                None => warn!("Ignoring unknown {} value: {}", ENV_API_MODE, mode),
            }
        }
    }
}

/// Remote service flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiMode {
    /// Scrape the watch page directly
    PageScrape,
    /// Self-hosted downloader API with endpoint and quality fallbacks
    SelfHosted,
    /// Account backend with quota metering; no fallbacks
    Backend,
}

impl ApiMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "page_scrape" | "scrape" => Some(Self::PageScrape),
            "self_hosted" | "selfhosted" => Some(Self::SelfHosted),
            "backend" => Some(Self::Backend),
            _ => None,
        }
    }

    /// Get string representation for display
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiMode::PageScrape => "Page scrape",
            ApiMode::SelfHosted => "Self-hosted API",
            ApiMode::Backend => "Account backend",
        }
    }

    /// Whether stream resolution may retry with substituted parameters
    pub fn allows_fallback(&self) -> bool {
        matches!(self, ApiMode::SelfHosted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = AppSettings::default();
        assert_eq!(config.api_mode, ApiMode::SelfHosted);
        assert_eq!(config.file_extension, "mp4");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_API_KEY, " key-123 "),
            (ENV_API_BASE, "https://api.example.com/"),
            (ENV_API_MODE, "backend"),
        ]
        .into_iter()
        .collect();

        let mut config = AppSettings::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.api_key.as_deref(), Some("key-123"));
        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.api_mode, ApiMode::Backend);
    }

    #[test]
    fn test_unknown_mode_is_ignored() {
        let mut config = AppSettings::default();
        config.apply_overrides(|k| (k == ENV_API_MODE).then(|| "carrier-pigeon".to_string()));
        assert_eq!(config.api_mode, ApiMode::SelfHosted);
    }

    #[test]
    fn test_api_key_is_not_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut config = AppSettings::default();
        config.api_key = Some("secret".to_string());
        config.api_mode = ApiMode::PageScrape;
        config.save_to(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("secret"));

        let loaded = AppSettings::load_from(&path).unwrap();
        assert_eq!(loaded.api_mode, ApiMode::PageScrape);
        assert!(loaded.api_key.is_none());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let loaded = AppSettings::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(loaded.api_mode, ApiMode::SelfHosted);
    }

    #[test]
    fn test_only_self_hosted_falls_back() {
        assert!(ApiMode::SelfHosted.allows_fallback());
        assert!(!ApiMode::Backend.allows_fallback());
        assert!(!ApiMode::PageScrape.allows_fallback());
    }
}
