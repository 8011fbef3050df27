//! Host download subsystem
//!
//! The host takes a URL and a suggested filename and reports a terminal
//! outcome. It never retries: an interruption is reported to the caller.

use crate::downloader::progress::DownloadProgress;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Why the host gave up on a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterruptReason {
    /// The server refused the request (401/403)
    ServerForbidden,
    /// Any other non-success status
    ServerBadContent,
    /// Connection dropped or could not be established
    NetworkFailed,
    /// The destination could not be written for lack of permission
    FileAccessDenied,
    /// The user declined the save prompt
    UserCanceled,
    /// Any other file-system failure
    FileFailed(String),
}

impl InterruptReason {
    /// Message shown in the interruption notification
    pub fn user_message(&self) -> String {
        match self {
            InterruptReason::ServerForbidden | InterruptReason::NetworkFailed => {
                "File not ready yet. Please try again in a moment.".to_string()
            }
            InterruptReason::FileAccessDenied => {
                "Cannot save the file. Check folder permissions.".to_string()
            }
            InterruptReason::ServerBadContent => {
                "The server returned no downloadable file.".to_string()
            }
            InterruptReason::UserCanceled => "Download cancelled.".to_string(),
            InterruptReason::FileFailed(reason) => format!("Download interrupted: {}", reason),
        }
    }

    fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => InterruptReason::ServerForbidden,
            _ => InterruptReason::ServerBadContent,
        }
    }

    fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => InterruptReason::FileAccessDenied,
            _ => InterruptReason::FileFailed(err.to_string()),
        }
    }
}

/// What to download and under which name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub filename: String,
    /// Ask the user where to save before starting
    pub save_as: bool,
}

/// Terminal state reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Complete { path: PathBuf, bytes: u64 },
    Interrupted(InterruptReason),
}

/// The platform's download manager
#[async_trait]
pub trait DownloadHost: Send + Sync {
    async fn download(
        &self,
        request: DownloadRequest,
        progress_tx: mpsc::Sender<DownloadProgress>,
    ) -> DownloadOutcome;
}

/// Streams downloads over HTTP into a directory
pub struct HttpDownloadHost {
    client: Client,
    download_dir: PathBuf,
    interactive: bool,
}

impl HttpDownloadHost {
    pub fn new(download_dir: PathBuf) -> crate::utils::error::Result<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36")
            .build()?;

        Ok(Self {
            client,
            download_dir,
            interactive: std::io::stdin().is_terminal(),
        })
    }

    /// Never prompt, even when attached to a terminal
    pub fn non_interactive(mut self) -> Self {
        self.interactive = false;
        self
    }

    async fn destination(&self, request: &DownloadRequest) -> Option<PathBuf> {
        let default = self.download_dir.join(&request.filename);
        if !(request.save_as && self.interactive) {
            return Some(default);
        }
        tokio::task::spawn_blocking(move || prompt_save_path(&default))
            .await
            .unwrap_or(None)
    }

    async fn stream_to_file(
        &self,
        url: &str,
        output_path: &Path,
        progress_tx: &mpsc::Sender<DownloadProgress>,
    ) -> Result<u64, InterruptReason> {
        let response = self.client.get(url).send().await.map_err(|e| {
            error!("Download request failed: {}", e);
            InterruptReason::NetworkFailed
        })?;

        if !response.status().is_success() {
            warn!("Download refused with status {}", response.status());
            return Err(InterruptReason::from_status(response.status()));
        }

        let mut progress = DownloadProgress::new(response.content_length().unwrap_or(0));
        if let Err(e) = progress_tx.send(progress.clone()).await {
            debug!("Progress receiver gone: {}", e);
        }

        let file = File::create(output_path)
            .await
            .map_err(|e| InterruptReason::from_io(&e))?;

        let written = Self::write_body(response, file, &mut progress, progress_tx).await;
        if written.is_err() {
            match tokio::fs::remove_file(output_path).await {
                Ok(()) => debug!("Removed partial file {:?}", output_path),
                Err(e) => warn!("Could not remove partial file {:?}: {}", output_path, e),
            }
        }
        written
    }

    /// Copy the body into `file`. The handle is closed when this returns.
    async fn write_body(
        response: reqwest::Response,
        mut file: File,
        progress: &mut DownloadProgress,
        progress_tx: &mpsc::Sender<DownloadProgress>,
    ) -> Result<u64, InterruptReason> {
        let mut downloaded = 0u64;

        let start_time = Instant::now();
        let mut last_update_time = start_time;

        let mut stream = response.bytes_stream();
        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| {
                error!("Download stream broke: {}", e);
                InterruptReason::NetworkFailed
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|e| InterruptReason::from_io(&e))?;
            downloaded += chunk.len() as u64;

            // Update progress every second
            let now = Instant::now();
            if now.duration_since(last_update_time) >= Duration::from_secs(1) {
                let elapsed = now.duration_since(start_time).as_secs_f64();
                let speed = if elapsed > 0.0 {
                    downloaded as f64 / elapsed
                } else {
                    0.0
                };
                progress.update(downloaded, speed);
                let _ = progress_tx.send(progress.clone()).await;
                last_update_time = now;
            }
        }

        file.flush().await.map_err(|e| InterruptReason::from_io(&e))?;

        progress.downloaded_bytes = downloaded;
        progress.complete();
        let _ = progress_tx.send(progress.clone()).await;

        Ok(downloaded)
    }
}

#[async_trait]
impl DownloadHost for HttpDownloadHost {
    async fn download(
        &self,
        request: DownloadRequest,
        progress_tx: mpsc::Sender<DownloadProgress>,
    ) -> DownloadOutcome {
        let Some(path) = self.destination(&request).await else {
            return DownloadOutcome::Interrupted(InterruptReason::UserCanceled);
        };

        info!("Downloading to {:?}", path);
        match self.stream_to_file(&request.url, &path, &progress_tx).await {
            Ok(bytes) => DownloadOutcome::Complete { path, bytes },
            Err(reason) => {
                let mut progress = DownloadProgress::new(0);
                progress.interrupted(format!("{:?}", reason));
                let _ = progress_tx.send(progress).await;
                DownloadOutcome::Interrupted(reason)
            }
        }
    }
}

/// Ask on the terminal where to save. Empty input keeps the default; "n" cancels.
fn prompt_save_path(default: &Path) -> Option<PathBuf> {
    print!("Save as [{}]: ", default.display());
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return Some(default.to_path_buf());
    }
    parse_save_answer(&answer, default)
}

fn parse_save_answer(answer: &str, default: &Path) -> Option<PathBuf> {
    match answer.trim() {
        "" => Some(default.to_path_buf()),
        "n" | "N" => None,
        other => {
            let chosen = PathBuf::from(other);
            if chosen.is_dir() {
                default.file_name().map(|name| chosen.join(name))
            } else {
                Some(chosen)
            }
        }
    }
}
