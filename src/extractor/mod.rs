pub mod api;
pub mod metadata;
pub mod models;
pub mod quality;
pub mod scrape;
pub mod stream;
pub mod traits;
pub mod url;

pub use api::{ApiClient, ApiFlavor};
pub use metadata::OEmbedClient;
pub use models::{
    Credential, FormatDescriptor, MediaKind, ResolvedStream, StreamRequest, UserInfo, VideoId,
    VideoInfo, VideoMetadata,
};
pub use quality::{select_best_quality, select_from_formats, DEFAULT_QUALITY};
pub use scrape::PageScraper;
pub use stream::StreamResolver;
pub use traits::{AccountService, MetadataSource, StreamSource};
pub use url::{extract_video_id, is_shorts_url};

use crate::utils::config::{ApiMode, AppSettings};
use crate::utils::error::Result;
use std::sync::Arc;

/// Build the stream source for the configured mode
pub fn stream_source_for(settings: &AppSettings) -> Result<Arc<dyn StreamSource>> {
    let source: Arc<dyn StreamSource> = match settings.api_mode {
        ApiMode::PageScrape => Arc::new(PageScraper::new(&settings.watch_base_url)?),
        ApiMode::SelfHosted => Arc::new(ApiClient::new(
            &settings.api_base_url,
            ApiFlavor::SelfHosted,
        )?),
        ApiMode::Backend => Arc::new(ApiClient::new(&settings.api_base_url, ApiFlavor::Backend)?),
    };
    Ok(source)
}
