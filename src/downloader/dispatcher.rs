//! Hands resolved streams to the host and reports how it went

use crate::downloader::host::{DownloadHost, DownloadOutcome, DownloadRequest};
use crate::downloader::progress::DownloadProgress;
use crate::utils::error::{Result, YtSaveError};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Build the save filename from a video title.
///
/// Every character outside `[A-Za-z0-9]` becomes `_`, then underscores at
/// either end are trimmed.
pub fn build_filename(title: &str, extension: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let stem = replaced.trim_matches('_');
    let stem = if stem.is_empty() { "video" } else { stem };
    format!("{}.{}", stem, extension.trim_start_matches('.'))
}

/// A user-facing notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub is_error: bool,
}

/// Shows notifications to the user
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Prints notifications to the terminal and the log
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: &Notification) {
        if notification.is_error {
            warn!("{}: {}", notification.title, notification.message);
            eprintln!("✗ {}: {}", notification.title, notification.message);
        } else {
            info!("{}: {}", notification.title, notification.message);
            println!("✓ {}: {}", notification.title, notification.message);
        }
    }
}

/// Sends resolved URLs to the host download manager
pub struct DownloadDispatcher {
    host: Arc<dyn DownloadHost>,
    notifier: Arc<dyn Notifier>,
    extension: String,
}

impl DownloadDispatcher {
    pub fn new(host: Arc<dyn DownloadHost>, notifier: Arc<dyn Notifier>, extension: &str) -> Self {
        Self {
            host,
            notifier,
            extension: extension.to_string(),
        }
    }

    /// Download `url` under a name derived from `title`.
    ///
    /// Completion and interruption each raise one notification. Interruptions
    /// are returned as errors and never retried.
    pub async fn dispatch(
        &self,
        url: &str,
        title: &str,
        progress_tx: mpsc::Sender<DownloadProgress>,
    ) -> Result<PathBuf> {
        let filename = build_filename(title, &self.extension);
        let request = DownloadRequest {
            url: url.to_string(),
            filename: filename.clone(),
            save_as: true,
        };

        match self.host.download(request, progress_tx).await {
            DownloadOutcome::Complete { path, bytes } => {
                info!("Download of {} finished ({} bytes)", filename, bytes);
                self.notifier.notify(&Notification {
                    title: "Download complete".to_string(),
                    message: format!("Saved {}", path.display()),
                    is_error: false,
                });
                Ok(path)
            }
            DownloadOutcome::Interrupted(reason) => {
                warn!("Download of {} interrupted: {:?}", filename, reason);
                self.notifier.notify(&Notification {
                    title: "Download failed".to_string(),
                    message: reason.user_message(),
                    is_error: true,
                });
                Err(YtSaveError::DownloadInterrupted(reason))
            }
        }
    }
}
