//! YTSave library

pub mod app;
pub mod backend;
pub mod downloader;
pub mod extractor;
pub mod session;
pub mod utils;

// Re-export main types for easier use
pub use app::Popup;
pub use backend::{BackendActor, BackendHandle};
pub use downloader::{DownloadDispatcher, DownloadProgress, DownloadStatus, HttpDownloadHost};
pub use extractor::{StreamResolver, VideoId, VideoInfo, VideoMetadata};
pub use session::{Session, SessionStore, SqliteStore};
pub use utils::{ApiMode, AppSettings, YtSaveError};
