//! Stream resolution with one-shot fallbacks

use crate::extractor::models::{Credential, ResolvedStream, StreamRequest, VideoId};
use crate::extractor::quality::DEFAULT_QUALITY;
use crate::extractor::traits::StreamSource;
use crate::utils::error::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Exchanges `(video, quality)` for a download URL.
///
/// With fallbacks enabled a failed attempt is retried at most twice: once on
/// the short-form endpoint (only when the video was not already short), then
/// once at the default quality (only when a different quality was asked for).
/// The error of the last attempt is returned unchanged.
pub struct StreamResolver {
    source: Arc<dyn StreamSource>,
    fallbacks: bool,
}

impl StreamResolver {
    pub fn new(source: Arc<dyn StreamSource>, fallbacks: bool) -> Self {
        Self { source, fallbacks }
    }

    pub fn source(&self) -> &Arc<dyn StreamSource> {
        &self.source
    }

    pub async fn resolve(
        &self,
        video_id: &VideoId,
        quality: &str,
        is_short: bool,
        credential: Option<Credential>,
    ) -> Result<ResolvedStream> {
        let request = StreamRequest {
            video_id: video_id.clone(),
            quality: quality.to_string(),
            is_short,
            credential,
        };

        let mut result = self.attempt(&request).await;
        if result.is_ok() || !self.fallbacks {
            return result;
        }

        if !is_short {
            warn!(
                "Regular endpoint failed for {}, retrying as short-form content",
                video_id
            );
            result = self
                .attempt(&StreamRequest {
                    is_short: true,
                    ..request.clone()
                })
                .await;
            if result.is_ok() {
                return result;
            }
        }

        if quality != DEFAULT_QUALITY {
            warn!(
                "Quality {} unavailable for {}, retrying at {}",
                quality, video_id, DEFAULT_QUALITY
            );
            result = self
                .attempt(&StreamRequest {
                    quality: DEFAULT_QUALITY.to_string(),
                    ..request
                })
                .await;
        }

        result
    }

    async fn attempt(&self, request: &StreamRequest) -> Result<ResolvedStream> {
        debug!(
            "Resolving {} at quality {} (short: {}) via {}",
            request.video_id,
            request.quality,
            request.is_short,
            self.source.id()
        );
        let resolved = self.source.resolve(request).await;
        if let Ok(stream) = &resolved {
            info!("Resolved stream for {} at quality {}", request.video_id, request.quality);
            if let Some(note) = &stream.note {
                debug!("Service note: {}", note);
            }
        }
        resolved
    }
}
