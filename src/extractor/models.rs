//! Data structures for video information

use serde::{Deserialize, Serialize};
use std::fmt;

/// An 11-character YouTube video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub const LEN: usize = 11;

    /// Accepts exactly 11 characters from `[A-Za-z0-9_-]`
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = raw.len() == Self::LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Display metadata for a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub video_id: VideoId,
    pub title: String,
    pub author: String,
    pub thumbnail: String,
    pub source_url: String,
    #[serde(default)]
    pub is_short: bool,
}

/// What a format stream carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    #[serde(alias = "video+audio", alias = "muxed")]
    Combined,
    #[serde(other)]
    Unknown,
}

impl MediaKind {
    /// Video-only and combined streams both carry a picture
    pub fn has_video(&self) -> bool {
        matches!(self, MediaKind::Video | MediaKind::Combined)
    }
}

/// A single format reported by the info service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// Quality code (an itag)
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
}

impl FormatDescriptor {
    pub fn new(id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// Video information from the info endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub formats: Vec<FormatDescriptor>,
    #[serde(default)]
    pub remaining_requests: Option<u64>,
    #[serde(default)]
    pub user_tier: Option<String>,
}

impl VideoInfo {
    /// Durations of a minute or less are short-form content
    pub fn is_short(&self) -> bool {
        matches!(self.duration, Some(d) if d <= 60)
    }
}

/// A concrete download URL for one attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStream {
    pub download_url: String,
    pub approximate_size_bytes: Option<u64>,
    pub note: Option<String>,
    pub remaining_requests: Option<u64>,
}

impl ResolvedStream {
    pub fn new(download_url: impl Into<String>) -> Self {
        Self {
            download_url: download_url.into(),
            approximate_size_bytes: None,
            note: None,
            remaining_requests: None,
        }
    }
}

/// The per-user API key. Debug output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Parameters of one stream resolution attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub video_id: VideoId,
    pub quality: String,
    pub is_short: bool,
    pub credential: Option<Credential>,
}

/// Account details reported by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub tier: String,
    pub usage: u64,
    pub limit: u64,
    pub remaining: u64,
}
