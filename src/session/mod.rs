//! Session persistence

pub mod credentials;
pub mod state;
pub mod storage;

// Re-export for convenience
pub use credentials::{CredentialStore, KEY_API_KEY};
pub use state::{DownloadGuard, ProgressSnapshot, Session, SessionRecord, SessionStore};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
