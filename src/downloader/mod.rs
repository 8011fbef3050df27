//! Download dispatch module

pub mod dispatcher;
pub mod host;
pub mod progress;

// Re-export for convenience
pub use dispatcher::{build_filename, ConsoleNotifier, DownloadDispatcher, Notification, Notifier};
pub use host::{DownloadHost, DownloadOutcome, DownloadRequest, HttpDownloadHost, InterruptReason};
pub use progress::{DownloadProgress, DownloadStatus};
