//! Watch-page scraping
//!
//! Reads the player response embedded in the watch page and picks streams from
//! its `streamingData`. No credential is needed.

use crate::extractor::models::{
    Credential, FormatDescriptor, MediaKind, ResolvedStream, StreamRequest, VideoId, VideoInfo,
};
use crate::extractor::traits::StreamSource;
use crate::extractor::url::watch_url;
use crate::utils::error::{Result, YtSaveError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

const PLAYER_RESPONSE_MARKER: &str = "ytInitialPlayerResponse";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    #[serde(default)]
    playability_status: Option<PlayabilityStatus>,
    #[serde(default)]
    streaming_data: Option<StreamingData>,
    #[serde(default)]
    video_details: Option<VideoDetails>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamingData {
    #[serde(default)]
    formats: Vec<PageFormat>,
    #[serde(default)]
    adaptive_formats: Vec<PageFormat>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoDetails {
    #[serde(default)]
    length_seconds: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageFormat {
    itag: u32,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    content_length: Option<String>,
}

impl PageFormat {
    fn mime(&self) -> &str {
        self.mime_type.as_deref().unwrap_or("")
    }

    fn is_mp4_video(&self) -> bool {
        self.mime().contains("video/mp4")
    }

    fn size(&self) -> Option<u64> {
        self.content_length.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Streams and duration pulled out of a watch page
#[derive(Debug)]
struct ScrapedPage {
    duration: Option<u64>,
    streaming: StreamingData,
}

impl ScrapedPage {
    fn descriptors(&self) -> Vec<FormatDescriptor> {
        let combined = self
            .streaming
            .formats
            .iter()
            .map(|f| FormatDescriptor::new(f.itag.to_string(), kind_of(f, true)));
        let adaptive = self
            .streaming
            .adaptive_formats
            .iter()
            .map(|f| FormatDescriptor::new(f.itag.to_string(), kind_of(f, false)));
        combined.chain(adaptive).collect()
    }

    /// A combined (video plus audio) format with this itag
    fn find_combined(&self, itag: &str) -> Option<&PageFormat> {
        self.streaming
            .formats
            .iter()
            .find(|f| f.itag.to_string() == itag && f.url.is_some())
    }

    /// Tallest MP4 with both tracks, else the tallest video-only MP4
    fn best_format(&self) -> Option<&PageFormat> {
        let combined = self
            .streaming
            .formats
            .iter()
            .filter(|f| f.is_mp4_video() && f.url.is_some());
        if let Some(best) = tallest(combined) {
            return Some(best);
        }

        let video_only = self
            .streaming
            .adaptive_formats
            .iter()
            .filter(|f| f.is_mp4_video() && !f.mime().contains("audio") && f.url.is_some());
        tallest(video_only)
    }
}

/// Formats without a reported height never win
fn tallest<'a>(formats: impl Iterator<Item = &'a PageFormat>) -> Option<&'a PageFormat> {
    let mut best = None;
    let mut best_height = 0;
    for format in formats {
        let height = format.height.unwrap_or(0);
        if height > best_height {
            best_height = height;
            best = Some(format);
        }
    }
    best
}

fn kind_of(format: &PageFormat, muxed: bool) -> MediaKind {
    let mime = format.mime();
    if mime.starts_with("audio/") {
        MediaKind::Audio
    } else if mime.starts_with("video/") {
        if muxed {
            MediaKind::Combined
        } else {
            MediaKind::Video
        }
    } else {
        MediaKind::Unknown
    }
}

/// Locate and parse the player response embedded in a watch page
fn parse_watch_page(html: &str) -> Result<ScrapedPage> {
    let not_found = || YtSaveError::Extraction("Could not extract video information".to_string());

    let marker = html.find(PLAYER_RESPONSE_MARKER).ok_or_else(not_found)?;
    let rest = &html[marker + PLAYER_RESPONSE_MARKER.len()..];
    let rest = rest.trim_start().strip_prefix('=').ok_or_else(not_found)?;

    // Parse exactly one JSON value and ignore the script that follows it
    let player: PlayerResponse = serde_json::Deserializer::from_str(rest.trim_start())
        .into_iter::<PlayerResponse>()
        .next()
        .ok_or_else(not_found)?
        .map_err(|e| YtSaveError::Extraction(format!("Malformed player response: {}", e)))?;

    let status = player.playability_status.as_ref();
    if status.and_then(|s| s.status.as_deref()) != Some("OK") {
        let reason = status
            .and_then(|s| s.reason.clone())
            .unwrap_or_else(|| "Video is not available".to_string());
        return Err(YtSaveError::Extraction(reason));
    }

    let streaming = player
        .streaming_data
        .ok_or_else(|| YtSaveError::Extraction("No streaming data available".to_string()))?;

    let duration = player
        .video_details
        .and_then(|d| d.length_seconds)
        .and_then(|s| s.parse().ok());

    Ok(ScrapedPage {
        duration,
        streaming,
    })
}

/// Stream source that reads the watch page directly
pub struct PageScraper {
    client: Client,
    watch_base_url: String,
}

impl PageScraper {
    pub fn new(watch_base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36")
            .build()?;

        Ok(Self {
            client,
            watch_base_url: watch_base_url.to_string(),
        })
    }

    async fn fetch_page(&self, video_id: &VideoId) -> Result<ScrapedPage> {
        let url = watch_url(&self.watch_base_url, video_id);
        debug!("Scraping watch page {}", url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(YtSaveError::remote(status.as_u16(), None));
        }
        let html = response.text().await?;
        parse_watch_page(&html)
    }
}

#[async_trait]
impl StreamSource for PageScraper {
    fn id(&self) -> &'static str {
        "page-scrape"
    }

    async fn video_info(
        &self,
        video_id: &VideoId,
        _credential: Option<&Credential>,
    ) -> Result<VideoInfo> {
        let page = self.fetch_page(video_id).await?;
        Ok(VideoInfo {
            duration: page.duration,
            url: Some(watch_url(&self.watch_base_url, video_id)),
            formats: page.descriptors(),
            ..Default::default()
        })
    }

    async fn resolve(&self, request: &StreamRequest) -> Result<ResolvedStream> {
        let page = self.fetch_page(&request.video_id).await?;
        select_stream(&page, &request.quality)
    }
}

/// Adaptive streams carry a single track, so a requested itag is honoured only
/// when it is a combined format no shorter than the best one.
fn select_stream(page: &ScrapedPage, quality: &str) -> Result<ResolvedStream> {
    let best = page
        .best_format()
        .ok_or_else(|| YtSaveError::Extraction("No suitable video format found".to_string()))?;

    let format = match page.find_combined(quality) {
        Some(requested) if requested.height.unwrap_or(0) >= best.height.unwrap_or(0) => requested,
        _ => {
            if best.itag.to_string() != quality {
                warn!(
                    "Quality {} is not the tallest combined stream, using itag {}",
                    quality, best.itag
                );
            }
            best
        }
    };

    let download_url = format
        .url
        .clone()
        .ok_or_else(|| YtSaveError::Extraction("No suitable video format found".to_string()))?;

    Ok(ResolvedStream {
        download_url,
        approximate_size_bytes: format.size(),
        note: format.height.map(|h| format!("{}p", h)),
        remaining_requests: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(json: &str) -> String {
        format!(
            "<html><script>var ytInitialPlayerResponse = {};var meta = {{}};</script></html>",
            json
        )
    }

    const PLAYABLE: &str = r#"{
        "playabilityStatus": {"status": "OK"},
        "videoDetails": {"lengthSeconds": "212"},
        "streamingData": {
            "formats": [
                {"itag": 18, "url": "https://cdn/18", "mimeType": "video/mp4; codecs=\"avc1\"", "height": 360},
                {"itag": 22, "url": "https://cdn/22", "mimeType": "video/mp4; codecs=\"avc1\"", "height": 720, "contentLength": "5000"}
            ],
            "adaptiveFormats": [
                {"itag": 137, "url": "https://cdn/137", "mimeType": "video/mp4; codecs=\"avc1\"", "height": 1080},
                {"itag": 140, "url": "https://cdn/140", "mimeType": "audio/mp4; codecs=\"mp4a\""}
            ]
        }
    }"#;

    #[test]
    fn test_parse_playable_page() {
        let scraped = parse_watch_page(&page(PLAYABLE)).unwrap();
        assert_eq!(scraped.duration, Some(212));

        let descriptors = scraped.descriptors();
        assert_eq!(descriptors.len(), 4);
        assert_eq!(descriptors[0], FormatDescriptor::new("18", MediaKind::Combined));
        assert_eq!(descriptors[2], FormatDescriptor::new("137", MediaKind::Video));
        assert_eq!(descriptors[3], FormatDescriptor::new("140", MediaKind::Audio));
    }

    #[test]
    fn test_adaptive_itag_never_beats_combined() {
        // 137 is video-only, so the tallest combined stream is used instead
        let scraped = parse_watch_page(&page(PLAYABLE)).unwrap();
        let stream = select_stream(&scraped, "137").unwrap();
        assert_eq!(stream.download_url, "https://cdn/22");
    }

    #[test]
    fn test_requested_combined_itag_wins_when_tallest() {
        let scraped = parse_watch_page(&page(PLAYABLE)).unwrap();
        assert_eq!(select_stream(&scraped, "22").unwrap().download_url, "https://cdn/22");
        // a shorter combined stream is passed over
        assert_eq!(select_stream(&scraped, "18").unwrap().download_url, "https://cdn/22");
    }

    #[test]
    fn test_selected_quality_resolves_to_stream_with_audio() {
        use crate::extractor::quality::select_from_formats;

        let scraped = parse_watch_page(&page(PLAYABLE)).unwrap();
        let quality = select_from_formats(&scraped.descriptors());
        assert_eq!(quality, "137");
        let stream = select_stream(&scraped, &quality).unwrap();
        assert_eq!(stream.download_url, "https://cdn/22");
    }

    #[test]
    fn test_falls_back_to_tallest_combined() {
        let scraped = parse_watch_page(&page(PLAYABLE)).unwrap();
        let stream = select_stream(&scraped, "571").unwrap();
        assert_eq!(stream.download_url, "https://cdn/22");
        assert_eq!(stream.approximate_size_bytes, Some(5000));
        assert_eq!(stream.note.as_deref(), Some("720p"));
    }

    #[test]
    fn test_falls_back_to_adaptive_video() {
        let json = r#"{
            "playabilityStatus": {"status": "OK"},
            "streamingData": {
                "adaptiveFormats": [
                    {"itag": 135, "url": "https://cdn/135", "mimeType": "video/mp4", "height": 480},
                    {"itag": 137, "url": "https://cdn/137", "mimeType": "video/mp4", "height": 1080},
                    {"itag": 140, "url": "https://cdn/140", "mimeType": "audio/mp4"}
                ]
            }
        }"#;
        let scraped = parse_watch_page(&page(json)).unwrap();
        assert_eq!(select_stream(&scraped, "999").unwrap().download_url, "https://cdn/137");
    }

    #[test]
    fn test_unplayable_reports_reason() {
        let json = r#"{"playabilityStatus": {"status": "LOGIN_REQUIRED", "reason": "Sign in to confirm your age"}}"#;
        let err = parse_watch_page(&page(json)).unwrap_err();
        assert_eq!(err.to_string(), "Failed to extract video info: Sign in to confirm your age");

        let json = r#"{"playabilityStatus": {"status": "ERROR"}}"#;
        let err = parse_watch_page(&page(json)).unwrap_err();
        assert!(err.to_string().contains("Video is not available"));
    }

    #[test]
    fn test_missing_streaming_data() {
        let json = r#"{"playabilityStatus": {"status": "OK"}}"#;
        let err = parse_watch_page(&page(json)).unwrap_err();
        assert!(err.to_string().contains("No streaming data available"));
    }

    #[test]
    fn test_page_without_player_response() {
        let err = parse_watch_page("<html></html>").unwrap_err();
        assert!(err.to_string().contains("Could not extract video information"));
    }

    #[test]
    fn test_no_mp4_stream() {
        let json = r#"{
            "playabilityStatus": {"status": "OK"},
            "streamingData": {"adaptiveFormats": [{"itag": 251, "url": "https://cdn/251", "mimeType": "audio/webm"}]}
        }"#;
        let scraped = parse_watch_page(&page(json)).unwrap();
        let err = select_stream(&scraped, "137").unwrap_err();
        assert!(err.to_string().contains("No suitable video format found"));
    }
}
