//! Popup controller: load a URL, show its metadata, download it

use crate::backend::BackendHandle;
use crate::downloader::{DownloadDispatcher, DownloadProgress, DownloadStatus};
use crate::extractor::{extract_video_id, is_shorts_url, MetadataSource, VideoMetadata};
use crate::session::{ProgressSnapshot, Session, SessionRecord, SessionStore};
use crate::utils::error::{Result, YtSaveError};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const METADATA_FAILED: &str =
    "Failed to load video information. Please check the URL and try again.";

/// Called with every progress update the popup shows
pub type ProgressListener = Arc<dyn Fn(&ProgressSnapshot) + Send + Sync>;

pub struct Popup {
    session: Session,
    metadata: Arc<dyn MetadataSource>,
    backend: BackendHandle,
    dispatcher: DownloadDispatcher,
    listener: Option<ProgressListener>,
}

impl Popup {
    pub fn new(
        session: Session,
        metadata: Arc<dyn MetadataSource>,
        backend: BackendHandle,
        dispatcher: DownloadDispatcher,
    ) -> Self {
        Self {
            session,
            metadata,
            backend,
            dispatcher,
            listener: None,
        }
    }

    pub fn with_progress_listener(mut self, listener: ProgressListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Last saved session record. Nothing is re-fetched.
    pub async fn restore(&self) -> Result<Option<SessionRecord>> {
        let record = self.session.store().restore().await?;
        if let Some(record) = &record {
            debug!(
                "Restored {} (downloading: {})",
                record.current_video.video_id, record.download_in_progress
            );
        }
        Ok(record)
    }

    /// Validate `url`, fetch its metadata and make it the current video
    pub async fn load_url(&self, url: &str) -> Result<VideoMetadata> {
        let url = url.trim();
        if url.is_empty() {
            return Err(YtSaveError::EmptyUrl);
        }
        let video_id =
            extract_video_id(url).ok_or_else(|| YtSaveError::InvalidUrl(url.to_string()))?;

        let mut metadata = self
            .metadata
            .fetch_metadata(&video_id)
            .await
            .map_err(|e| {
                error!("Metadata lookup for {} failed: {}", video_id, e);
                YtSaveError::Metadata(METADATA_FAILED.to_string())
            })?;
        metadata.is_short = is_shorts_url(url);

        self.session
            .store()
            .save(&SessionRecord {
                current_video: metadata.clone(),
                download_in_progress: false,
                progress: ProgressSnapshot::default(),
            })
            .await?;

        info!("Loaded \"{}\" by {}", metadata.title, metadata.author);
        Ok(metadata)
    }

    /// Download the current video at the best available quality
    pub async fn download(&self) -> Result<PathBuf> {
        let video = self
            .session
            .store()
            .restore()
            .await?
            .map(|record| record.current_video)
            .ok_or(YtSaveError::NoVideoLoaded)?;

        let _guard = self.session.begin_download()?;

        // session writes past this point are best effort
        match self.run_download(&video).await {
            Ok(path) => {
                if let Err(e) = self
                    .tick(&video, true, ProgressSnapshot::new("Download started!", 100))
                    .await
                {
                    warn!("Could not record finished download: {}", e);
                }
                if let Err(e) = self.session.store().clear().await {
                    warn!("Could not clear session: {}", e);
                }
                Ok(path)
            }
            Err(e) => {
                error!("Download of {} failed: {}", video.video_id, e);
                if let Err(reset) = self.tick(&video, false, ProgressSnapshot::default()).await {
                    error!("Could not reset session progress: {}", reset);
                }
                Err(e)
            }
        }
    }

    async fn run_download(&self, video: &VideoMetadata) -> Result<PathBuf> {
        self.tick(video, true, ProgressSnapshot::new("Preparing download...", 30))
            .await?;
        self.tick(
            video,
            true,
            ProgressSnapshot::new("Getting highest quality stream...", 60),
        )
        .await?;

        let selection = self
            .backend
            .video_stream(video.video_id.clone(), video.is_short)
            .await?;
        if let Some(note) = &selection.stream.note {
            info!("{}", note);
        }

        self.tick(video, true, ProgressSnapshot::new("Starting download...", 90))
            .await?;

        let (progress_tx, progress_rx) = mpsc::channel(100);
        let reporter = tokio::spawn(report_transfer(
            progress_rx,
            self.session.store().clone(),
            video.clone(),
            self.listener.clone(),
        ));

        let result = self
            .dispatcher
            .dispatch(&selection.stream.download_url, &video.title, progress_tx)
            .await;
        if reporter.await.is_err() {
            debug!("Progress reporter stopped early");
        }
        result
    }

    async fn tick(
        &self,
        video: &VideoMetadata,
        downloading: bool,
        progress: ProgressSnapshot,
    ) -> Result<()> {
        if let Some(listener) = &self.listener {
            listener(&progress);
        }
        self.session
            .store()
            .save(&SessionRecord {
                current_video: video.clone(),
                download_in_progress: downloading,
                progress,
            })
            .await
    }
}

/// Mirror transfer progress into the session between the 90% and 100% ticks
async fn report_transfer(
    mut progress_rx: mpsc::Receiver<DownloadProgress>,
    store: SessionStore,
    video: VideoMetadata,
    listener: Option<ProgressListener>,
) {
    let mut last_percent = 0u8;
    while let Some(progress) = progress_rx.recv().await {
        if matches!(progress.status, DownloadStatus::Interrupted(_)) || progress.total_bytes == 0 {
            continue;
        }
        let done = (progress.percentage() * 100.0).clamp(0.0, 100.0) as u8;
        if done == last_percent {
            continue;
        }
        last_percent = done;

        let text = match progress.rate_text() {
            Some(rate) => format!("Downloading... {}% ({})", done, rate),
            None => format!("Downloading... {}%", done),
        };
        let snapshot = ProgressSnapshot::new(text, 90 + done / 11);
        if let Some(listener) = &listener {
            listener(&snapshot);
        }
        let record = SessionRecord {
            current_video: video.clone(),
            download_in_progress: true,
            progress: snapshot,
        };
        if let Err(e) = store.save(&record).await {
            debug!("Could not persist transfer progress: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendActor;
    use crate::downloader::{
        DownloadHost, DownloadOutcome, DownloadRequest, InterruptReason, Notification, Notifier,
    };
    use crate::extractor::{
        Credential, FormatDescriptor, MediaKind, ResolvedStream, StreamRequest, StreamResolver,
        StreamSource, VideoId, VideoInfo,
    };
    use crate::session::{CredentialStore, KeyValueStore, MemoryStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeMetadata {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl MetadataSource for FakeMetadata {
        async fn fetch_metadata(&self, video_id: &VideoId) -> Result<VideoMetadata> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(YtSaveError::Metadata("lookup failed with status 404".to_string()));
            }
            Ok(VideoMetadata {
                video_id: video_id.clone(),
                title: "Test Clip".to_string(),
                author: "Someone".to_string(),
                thumbnail: format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id),
                source_url: format!("https://www.youtube.com/watch?v={}", video_id),
                is_short: false,
            })
        }
    }

    struct FakeSource;

    #[async_trait]
    impl StreamSource for FakeSource {
        fn id(&self) -> &'static str {
            "fake"
        }

        async fn video_info(
            &self,
            _video_id: &VideoId,
            _credential: Option<&Credential>,
        ) -> Result<VideoInfo> {
            Ok(VideoInfo {
                duration: Some(200),
                formats: vec![FormatDescriptor::new("137", MediaKind::Video)],
                ..Default::default()
            })
        }

        async fn resolve(&self, request: &StreamRequest) -> Result<ResolvedStream> {
            Ok(ResolvedStream::new(format!(
                "https://cdn/{}/{}",
                request.video_id, request.quality
            )))
        }
    }

    /// Memory store whose writes start failing once `broken` is set
    struct FlakyStore {
        inner: MemoryStore,
        broken: Arc<AtomicBool>,
    }

    impl FlakyStore {
        fn check(&self) -> Result<()> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(YtSaveError::Io(std::io::Error::other("disk full")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key).await
        }

        async fn set_many(&self, entries: &[(&str, String)]) -> Result<()> {
            self.check()?;
            self.inner.set_many(entries).await
        }

        async fn remove_many(&self, keys: &[&str]) -> Result<()> {
            self.check()?;
            self.inner.remove_many(keys).await
        }
    }

    struct FakeHost {
        outcome: DownloadOutcome,
        requests: Mutex<Vec<DownloadRequest>>,
        /// Set on the store while the transfer runs
        break_store: Option<Arc<AtomicBool>>,
    }

    #[async_trait]
    impl DownloadHost for FakeHost {
        async fn download(
            &self,
            request: DownloadRequest,
            progress_tx: mpsc::Sender<DownloadProgress>,
        ) -> DownloadOutcome {
            let mut progress = DownloadProgress::new(100);
            progress.update(50, 10.0);
            let _ = progress_tx.send(progress).await;
            self.requests.lock().unwrap().push(request);
            if let Some(broken) = &self.break_store {
                broken.store(true, Ordering::SeqCst);
            }
            self.outcome.clone()
        }
    }

    struct Silent;

    impl Notifier for Silent {
        fn notify(&self, _notification: &Notification) {}
    }

    struct Harness {
        popup: Popup,
        metadata: Arc<FakeMetadata>,
        host: Arc<FakeHost>,
        seen: Arc<Mutex<Vec<ProgressSnapshot>>>,
    }

    fn harness(outcome: DownloadOutcome, metadata_fails: bool) -> Harness {
        build_harness(outcome, metadata_fails, false)
    }

    fn build_harness(outcome: DownloadOutcome, metadata_fails: bool, store_breaks: bool) -> Harness {
        let broken = Arc::new(AtomicBool::new(false));
        let metadata = Arc::new(FakeMetadata {
            calls: AtomicUsize::new(0),
            fail: metadata_fails,
        });
        let host = Arc::new(FakeHost {
            outcome,
            requests: Mutex::new(Vec::new()),
            break_store: store_breaks.then(|| broken.clone()),
        });
        let backing = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            broken,
        });
        let backend = BackendActor::spawn(
            StreamResolver::new(Arc::new(FakeSource), true),
            None,
            CredentialStore::new(backing.clone(), Some("key".to_string())),
        );
        let dispatcher = DownloadDispatcher::new(host.clone(), Arc::new(Silent), "mp4");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let popup = Popup::new(
            Session::new(SessionStore::new(backing)),
            metadata.clone(),
            backend,
            dispatcher,
        )
        .with_progress_listener(Arc::new(move |p: &ProgressSnapshot| {
            sink.lock().unwrap().push(p.clone())
        }));

        Harness {
            popup,
            metadata,
            host,
            seen,
        }
    }

    fn completed() -> DownloadOutcome {
        DownloadOutcome::Complete {
            path: PathBuf::from("/tmp/Test_Clip.mp4"),
            bytes: 100,
        }
    }

    #[tokio::test]
    async fn test_empty_url_is_rejected() {
        let h = harness(completed(), false);
        let err = h.popup.load_url("   ").await.unwrap_err();
        assert_eq!(err.to_string(), "Please enter a YouTube URL");
        assert_eq!(h.metadata.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_url_makes_no_network_call() {
        let h = harness(completed(), false);
        let err = h.popup.load_url("https://vimeo.com/12345").await.unwrap_err();
        assert!(matches!(err, YtSaveError::InvalidUrl(_)));
        assert_eq!(h.metadata.calls.load(Ordering::SeqCst), 0);
        assert!(h.popup.restore().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_metadata_failure_message() {
        let h = harness(completed(), true);
        let err = h
            .popup
            .load_url("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), METADATA_FAILED);
    }

    #[tokio::test]
    async fn test_load_saves_idle_session() {
        let h = harness(completed(), false);
        let metadata = h
            .popup
            .load_url("https://www.youtube.com/shorts/dQw4w9WgXcQ")
            .await
            .unwrap();
        assert!(metadata.is_short);

        let record = h.popup.restore().await.unwrap().unwrap();
        assert_eq!(record.current_video, metadata);
        assert!(!record.download_in_progress);
        assert_eq!(record.progress, ProgressSnapshot::default());
    }

    #[tokio::test]
    async fn test_download_without_video() {
        let h = harness(completed(), false);
        let err = h.popup.download().await.unwrap_err();
        assert!(matches!(err, YtSaveError::NoVideoLoaded));
    }

    #[tokio::test]
    async fn test_download_ticks_and_clears_session() {
        let h = harness(completed(), false);
        h.popup
            .load_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .await
            .unwrap();

        let path = h.popup.download().await.unwrap();
        assert_eq!(path, PathBuf::from("/tmp/Test_Clip.mp4"));

        let requests = h.host.requests.lock().unwrap();
        assert_eq!(requests[0].url, "https://cdn/dQw4w9WgXcQ/137");
        assert_eq!(requests[0].filename, "Test_Clip.mp4");

        let seen = h.seen.lock().unwrap();
        let percents: Vec<u8> = seen.iter().map(|p| p.percent).collect();
        assert_eq!(percents.first(), Some(&30));
        assert_eq!(percents.last(), Some(&100));
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert!(seen.iter().any(|p| p.text == "Getting highest quality stream..."));
        assert!(seen
            .iter()
            .any(|p| p.percent == 94 && p.text == "Downloading... 50% (10 B/s, 5s left)"));

        assert!(h.popup.restore().await.unwrap().is_none());
        assert!(!h.popup.session().is_downloading());
    }

    #[tokio::test]
    async fn test_interrupted_download_resets_progress() {
        let h = harness(
            DownloadOutcome::Interrupted(InterruptReason::NetworkFailed),
            false,
        );
        h.popup
            .load_url("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap();

        let err = h.popup.download().await.unwrap_err();
        assert_eq!(
            err.user_message(),
            "File not ready yet. Please try again in a moment."
        );

        let record = h.popup.restore().await.unwrap().unwrap();
        assert!(!record.download_in_progress);
        assert_eq!(record.progress, ProgressSnapshot::default());
        assert!(!h.popup.session().is_downloading());
    }

    #[tokio::test]
    async fn test_failed_reset_keeps_download_error() {
        let h = build_harness(
            DownloadOutcome::Interrupted(InterruptReason::NetworkFailed),
            false,
            true,
        );
        h.popup
            .load_url("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap();

        let err = h.popup.download().await.unwrap_err();
        assert!(matches!(
            err,
            YtSaveError::DownloadInterrupted(InterruptReason::NetworkFailed)
        ));
        assert_eq!(
            err.user_message(),
            "File not ready yet. Please try again in a moment."
        );
        assert!(!h.popup.session().is_downloading());
    }

    #[tokio::test]
    async fn test_saved_file_survives_session_write_failure() {
        let h = build_harness(completed(), false, true);
        h.popup
            .load_url("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap();

        let path = h.popup.download().await.unwrap();
        assert_eq!(path, PathBuf::from("/tmp/Test_Clip.mp4"));
        assert!(!h.popup.session().is_downloading());
    }
}
