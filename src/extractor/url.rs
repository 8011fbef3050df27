//! YouTube URL validation
//!
//! Pattern rules are tried in a fixed order and the first capture wins:
//! watch pages, `youtu.be` short links, embeds, `/v/` links, then shorts.

use crate::extractor::models::VideoId;
use regex::Regex;

lazy_static::lazy_static! {
    static ref URL_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"youtube\.com/watch\?(?:[^#\s]*&)?v=([A-Za-z0-9_-]{11})").unwrap(),
        Regex::new(r"youtu\.be/([A-Za-z0-9_-]{11})").unwrap(),
        Regex::new(r"youtube\.com/embed/([A-Za-z0-9_-]{11})").unwrap(),
        Regex::new(r"youtube\.com/v/([A-Za-z0-9_-]{11})").unwrap(),
        Regex::new(r"youtube\.com/shorts/([A-Za-z0-9_-]{11})").unwrap(),
    ];
    static ref SHORTS_MARKER: Regex = Regex::new(r"youtube\.com/shorts/").unwrap();
}

/// Extract the video identifier from any accepted URL shape
pub fn extract_video_id(url: &str) -> Option<VideoId> {
    URL_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .and_then(|caps| caps.get(1))
        .and_then(|m| VideoId::parse(m.as_str()))
}

/// Whether the URL path marks short-form content
pub fn is_shorts_url(url: &str) -> bool {
    SHORTS_MARKER.is_match(url)
}

/// Canonical watch URL for an identifier
pub fn watch_url(base: &str, id: &VideoId) -> String {
    format!("{}/watch?v={}", base.trim_end_matches('/'), id)
}
