//! Display metadata via oEmbed

use crate::extractor::models::{VideoId, VideoMetadata};
use crate::extractor::traits::MetadataSource;
use crate::extractor::url::watch_url;
use crate::utils::error::{Result, YtSaveError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

const PLACEHOLDER_TITLE: &str = "Untitled video";
const PLACEHOLDER_AUTHOR: &str = "Unknown author";

#[derive(Debug, Default, Deserialize)]
struct OEmbedResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author_name: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
}

/// Thumbnail served for every public video
pub fn default_thumbnail(video_id: &VideoId) -> String {
    format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id)
}

/// Metadata fetcher backed by an oEmbed endpoint
pub struct OEmbedClient {
    client: Client,
    oembed_base_url: String,
    watch_base_url: String,
}

impl OEmbedClient {
    pub fn new(oembed_base_url: &str, watch_base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("ytsave/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            oembed_base_url: oembed_base_url.trim_end_matches('/').to_string(),
            watch_base_url: watch_base_url.to_string(),
        })
    }
}

#[async_trait]
impl MetadataSource for OEmbedClient {
    async fn fetch_metadata(&self, video_id: &VideoId) -> Result<VideoMetadata> {
        let source_url = watch_url(&self.watch_base_url, video_id);
        let endpoint = format!("{}/oembed", self.oembed_base_url);
        debug!("Fetching oEmbed metadata for {}", video_id);

        let response = self
            .client
            .get(&endpoint)
            .query(&[("url", source_url.as_str()), ("format", "json")])
            .send()
            .await?;

        if !response.status().is_success() {
            error!("oEmbed lookup failed with status {}", response.status());
            return Err(YtSaveError::Metadata(format!(
                "lookup failed with status {}",
                response.status().as_u16()
            )));
        }

        let body: OEmbedResponse = response.json().await?;
        Ok(into_metadata(body, video_id, source_url))
    }
}

/// Missing fields degrade to placeholders rather than failing
fn into_metadata(body: OEmbedResponse, video_id: &VideoId, source_url: String) -> VideoMetadata {
    let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());

    VideoMetadata {
        video_id: video_id.clone(),
        title: non_empty(body.title).unwrap_or_else(|| PLACEHOLDER_TITLE.to_string()),
        author: non_empty(body.author_name).unwrap_or_else(|| PLACEHOLDER_AUTHOR.to_string()),
        thumbnail: non_empty(body.thumbnail_url).unwrap_or_else(|| default_thumbnail(video_id)),
        source_url,
        is_short: false,
    }
}
