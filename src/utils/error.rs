//! Error handling for YTSave

use crate::downloader::InterruptReason;
use thiserror::Error;

/// Hint appended to remote errors that talk about quotas
const UPSELL_HINT: &str = "Upgrade your plan for more downloads.";

/// Main error type for YTSave
#[derive(Debug, Error)]
pub enum YtSaveError {
    #[error("Please enter a YouTube URL")]
    EmptyUrl,

    #[error("Invalid or unsupported YouTube URL: {0}")]
    InvalidUrl(String),

    #[error("{message}")]
    Remote { status: Option<u16>, message: String },

    #[error("Please register or log in first")]
    MissingCredential,

    #[error("{0}")]
    Metadata(String),

    #[error("Failed to extract video info: {0}")]
    Extraction(String),

    #[error("Download interrupted: {0:?}")]
    DownloadInterrupted(InterruptReason),

    #[error("A download is already in progress")]
    AlreadyDownloading,

    #[error("No video loaded")]
    NoVideoLoaded,

    #[error("{0} is not available in this API mode")]
    Unsupported(&'static str),

    #[error("Background worker is not running")]
    BackendUnavailable,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, YtSaveError>;

impl YtSaveError {
    /// Build a remote error from an HTTP status and an optional service message
    pub fn remote(status: u16, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("Request failed with status {}", status));
        Self::Remote {
            status: Some(status),
            message,
        }
    }

    /// Text shown to the user in the error banner.
    ///
    /// Quota and limit messages from the service get an upgrade hint attached.
    pub fn user_message(&self) -> String {
        match self {
            Self::Remote { message, .. } => {
                let lower = message.to_lowercase();
                if lower.contains("limit") || lower.contains("quota") {
                    format!("{} {}", message, UPSELL_HINT)
                } else {
                    message.clone()
                }
            }
            Self::DownloadInterrupted(reason) => reason.user_message(),
            other => other.to_string(),
        }
    }
}
