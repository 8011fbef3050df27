//! Clipboard URL detection

use crate::extractor::url::extract_video_id;
use arboard::Clipboard;

/// Get clipboard content
pub fn get_clipboard_content() -> Result<String, String> {
    let mut clipboard =
        Clipboard::new().map_err(|e| format!("Failed to access clipboard: {}", e))?;

    clipboard
        .get_text()
        .map_err(|e| format!("Failed to read clipboard: {}", e))
}

/// Return the clipboard text if it holds a recognisable video URL
pub fn detect_video_url() -> Option<String> {
    let text = get_clipboard_content().ok()?;
    detect_in_text(&text)
}

fn detect_in_text(text: &str) -> Option<String> {
    let candidate = text.trim();
    extract_video_id(candidate).map(|_| candidate.to_string())
}
