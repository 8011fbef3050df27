//! Persisted session record and the single-download guard

use crate::extractor::models::VideoMetadata;
use crate::session::storage::KeyValueStore;
use crate::utils::error::{Result, YtSaveError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

pub const KEY_CURRENT_VIDEO: &str = "currentVideo";
pub const KEY_IS_DOWNLOADING: &str = "isDownloading";
pub const KEY_DOWNLOAD_PROGRESS: &str = "downloadProgress";

/// Progress text and bar width as last shown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub text: String,
    pub percent: u8,
}

impl ProgressSnapshot {
    pub fn new(text: impl Into<String>, percent: u8) -> Self {
        Self {
            text: text.into(),
            percent: percent.min(100),
        }
    }
}

/// The one session record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub current_video: VideoMetadata,
    pub download_in_progress: bool,
    pub progress: ProgressSnapshot,
}

/// Reads and writes the session record under fixed keys
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Replace any previous record
    pub async fn save(&self, record: &SessionRecord) -> Result<()> {
        self.store
            .set_many(&[
                (KEY_CURRENT_VIDEO, serde_json::to_string(&record.current_video)?),
                (
                    KEY_IS_DOWNLOADING,
                    serde_json::to_string(&record.download_in_progress)?,
                ),
                (KEY_DOWNLOAD_PROGRESS, serde_json::to_string(&record.progress)?),
            ])
            .await?;
        debug!(
            "Saved session for {} ({}%)",
            record.current_video.video_id, record.progress.percent
        );
        Ok(())
    }

    /// Last saved record, if any
    pub async fn restore(&self) -> Result<Option<SessionRecord>> {
        let Some(raw_video) = self.store.get(KEY_CURRENT_VIDEO).await? else {
            return Ok(None);
        };

        let current_video = match serde_json::from_str(&raw_video) {
            Ok(video) => video,
            Err(e) => {
                warn!("Discarding unreadable session record: {}", e);
                return Ok(None);
            }
        };

        let download_in_progress = match self.store.get(KEY_IS_DOWNLOADING).await? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or(false),
            None => false,
        };
        let progress = match self.store.get(KEY_DOWNLOAD_PROGRESS).await? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            None => ProgressSnapshot::default(),
        };

        Ok(Some(SessionRecord {
            current_video,
            download_in_progress,
            progress,
        }))
    }

    pub async fn clear(&self) -> Result<()> {
        self.store
            .remove_many(&[KEY_CURRENT_VIDEO, KEY_IS_DOWNLOADING, KEY_DOWNLOAD_PROGRESS])
            .await
    }
}

/// Session state owned by the popup controller
pub struct Session {
    store: SessionStore,
    downloading: AtomicBool,
}

impl Session {
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            downloading: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn is_downloading(&self) -> bool {
        self.downloading.load(Ordering::SeqCst)
    }

    /// Claim the single download slot
    pub fn begin_download(&self) -> Result<DownloadGuard<'_>> {
        self.downloading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| YtSaveError::AlreadyDownloading)?;
        Ok(DownloadGuard {
            flag: &self.downloading,
        })
    }
}

/// Releases the download slot when dropped
#[must_use = "the download slot is released as soon as the guard is dropped"]
pub struct DownloadGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for DownloadGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::models::VideoId;
    use crate::session::storage::MemoryStore;

    fn record() -> SessionRecord {
        SessionRecord {
            current_video: VideoMetadata {
                video_id: VideoId::parse("dQw4w9WgXcQ").unwrap(),
                title: "Never Gonna Give You Up".to_string(),
                author: "Rick Astley".to_string(),
                thumbnail: "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg".to_string(),
                source_url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
                is_short: false,
            },
            download_in_progress: true,
            progress: ProgressSnapshot::new("Getting highest quality stream...", 60),
        }
    }

    #[tokio::test]
    async fn test_save_restore_round_trip() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        store.save(&record()).await.unwrap();
        assert_eq!(store.restore().await.unwrap(), Some(record()));
    }

    #[tokio::test]
    async fn test_clear_then_restore_is_none() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        store.save(&record()).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.restore().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_overwrites_without_merging() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        store.save(&record()).await.unwrap();

        let mut next = record();
        next.download_in_progress = false;
        next.progress = ProgressSnapshot::default();
        store.save(&next).await.unwrap();

        assert_eq!(store.restore().await.unwrap(), Some(next));
    }

    #[tokio::test]
    async fn test_corrupt_record_restores_as_none() {
        let backing = Arc::new(MemoryStore::new());
        backing
            .set(KEY_CURRENT_VIDEO, "{not json".to_string())
            .await
            .unwrap();
        let store = SessionStore::new(backing);
        assert_eq!(store.restore().await.unwrap(), None);
    }

    #[test]
    fn test_progress_percent_is_capped() {
        assert_eq!(ProgressSnapshot::new("done", 250).percent, 100);
    }

    #[test]
    fn test_guard_rejects_second_download() {
        let session = Session::new(SessionStore::new(Arc::new(MemoryStore::new())));
        let guard = session.begin_download().unwrap();
        assert!(session.is_downloading());
        assert!(matches!(
            session.begin_download(),
            Err(YtSaveError::AlreadyDownloading)
        ));

        drop(guard);
        assert!(!session.is_downloading());
        assert!(session.begin_download().is_ok());
    }
}
