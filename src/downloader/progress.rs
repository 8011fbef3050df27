//! Progress tracking for downloads

use std::time::Duration;

/// Progress tracking structure
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    pub total_bytes: u64,
    pub downloaded_bytes: u64,
    pub speed: f64, // bytes per second
    pub eta: Option<Duration>,
    pub status: DownloadStatus,
}

impl DownloadProgress {
    /// Create a new progress tracker. `total_bytes` is 0 when the size is unknown.
    pub fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            downloaded_bytes: 0,
            speed: 0.0,
            eta: None,
            status: DownloadStatus::Initializing,
        }
    }

    /// Update progress with new data
    pub fn update(&mut self, downloaded_bytes: u64, speed: f64) {
        self.downloaded_bytes = downloaded_bytes;
        self.speed = speed;
        self.status = DownloadStatus::Downloading;

        if self.total_bytes > 0 && self.downloaded_bytes >= self.total_bytes {
            self.eta = Some(Duration::from_secs(0));
        } else if speed > 0.0 && self.total_bytes > 0 {
            let remaining = self.total_bytes - self.downloaded_bytes;
            self.eta = Some(Duration::from_secs_f64((remaining as f64) / speed));
        } else {
            self.eta = None;
        }
    }

    /// Mark as completed
    pub fn complete(&mut self) {
        self.status = DownloadStatus::Completed;
        if self.total_bytes == 0 {
            self.total_bytes = self.downloaded_bytes;
        }
        self.downloaded_bytes = self.total_bytes;
        self.eta = Some(Duration::from_secs(0));
    }

    /// Mark as interrupted
    pub fn interrupted(&mut self, reason: String) {
        self.status = DownloadStatus::Interrupted(reason);
    }

    /// Get progress percentage (0.0 to 1.0)
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.downloaded_bytes as f64 / self.total_bytes as f64).min(1.0)
    }

    /// Transfer rate and time left, e.g. "1.5 MB/s, 1m05s left". `None` until
    /// both are known or once the transfer has stopped.
    pub fn rate_text(&self) -> Option<String> {
        if self.status != DownloadStatus::Downloading || self.speed <= 0.0 {
            return None;
        }
        let eta = self.eta?;
        Some(format!("{}, {} left", format_speed(self.speed), format_eta(eta)))
    }
}

fn format_speed(bytes_per_sec: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    if bytes_per_sec >= MB {
        format!("{:.1} MB/s", bytes_per_sec / MB)
    } else if bytes_per_sec >= KB {
        format!("{:.1} KB/s", bytes_per_sec / KB)
    } else {
        format!("{:.0} B/s", bytes_per_sec)
    }
}

fn format_eta(eta: Duration) -> String {
    let secs = eta.as_secs();
    if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

/// Download status
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DownloadStatus {
    #[default]
    Initializing,
    Downloading,
    Completed,
    Interrupted(String),
}
