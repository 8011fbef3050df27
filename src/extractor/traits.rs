use crate::extractor::models::{
    Credential, ResolvedStream, StreamRequest, UserInfo, VideoId, VideoInfo, VideoMetadata,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Core trait for the services that report formats and hand out stream URLs
///
/// This isolates the download flow from the specific revision of the remote
/// service (page scraping, self-hosted API, account backend).
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Returns a unique identifier for this source (e.g., "self-hosted", "page-scrape")
    fn id(&self) -> &'static str;

    /// Reports duration and available formats
    async fn video_info(
        &self,
        video_id: &VideoId,
        credential: Option<&Credential>,
    ) -> Result<VideoInfo>;

    /// Exchanges a quality code for a concrete download URL. One attempt, no retries.
    async fn resolve(&self, request: &StreamRequest) -> Result<ResolvedStream>;
}

/// Resolves display metadata for a video
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch_metadata(&self, video_id: &VideoId) -> Result<VideoMetadata>;
}

/// Account operations offered by the backend
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Creates an account and returns its API key
    async fn register(&self, email: &str, name: &str) -> Result<Credential>;

    async fn user_info(&self, credential: &Credential) -> Result<UserInfo>;
}
