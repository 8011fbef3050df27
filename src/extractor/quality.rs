//! Quality selection
//!
//! Picks the best quality code from what the info service reports, scanning a
//! fixed priority list from the highest resolution down.

use crate::extractor::models::FormatDescriptor;

/// 720p, used when nothing video-bearing is reported
pub const DEFAULT_QUALITY: &str = "136";

/// Known quality codes, best first
pub const QUALITY_PRIORITY: [(&str, &str); 12] = [
    ("571", "8K"),
    ("313", "4K"),
    ("271", "1440p"),
    ("299", "1080p60"),
    ("137", "1080p"),
    ("248", "1080p VP9"),
    ("136", "720p"),
    ("247", "720p VP9"),
    ("135", "480p"),
    ("134", "360p"),
    ("133", "240p"),
    ("160", "144p"),
];

/// Pick the highest-priority code present in `available`.
///
/// An empty set yields [`DEFAULT_QUALITY`]. A non-empty set with no known code
/// yields its first element rather than the default.
pub fn select_best_quality<S: AsRef<str>>(available: &[S]) -> String {
    if available.is_empty() {
        return DEFAULT_QUALITY.to_string();
    }

    let ranked = QUALITY_PRIORITY
        .iter()
        .map(|(code, _)| *code)
        .find(|code| available.iter().any(|a| a.as_ref() == *code));

    match ranked {
        Some(code) => code.to_string(),
        None => available[0].as_ref().to_string(),
    }
}

/// Select from reported formats, ignoring audio-only entries
pub fn select_from_formats(formats: &[FormatDescriptor]) -> String {
    let video_codes: Vec<&str> = formats
        .iter()
        .filter(|f| f.kind.has_video())
        .map(|f| f.id.as_str())
        .collect();
    select_best_quality(&video_codes)
}

/// Human label for a code, if it is on the priority list
pub fn quality_label(code: &str) -> Option<&'static str> {
    QUALITY_PRIORITY
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
}
