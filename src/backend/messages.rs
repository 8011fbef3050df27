use crate::extractor::{Credential, ResolvedStream, UserInfo, VideoId, VideoInfo};
use crate::utils::error::YtSaveError;
use tokio::sync::oneshot;

/// Requests sent from the popup to the background worker
#[derive(Debug, Clone)]
pub enum BackendRequest {
    VideoInfo {
        video_id: VideoId,
    },
    /// Pick the best quality and resolve a download URL for it
    VideoStream {
        video_id: VideoId,
        is_short: bool,
    },
    Register {
        email: String,
        name: String,
    },
    UserInfo,
}

/// Successful replies, one variant per request kind
#[derive(Debug, Clone)]
pub enum BackendReply {
    VideoInfo(VideoInfo),
    Stream(StreamSelection),
    Registered { api_key: Credential },
    UserInfo(UserInfo),
}

/// The outcome of a stream request
#[derive(Debug, Clone)]
pub struct StreamSelection {
    pub quality: String,
    pub is_short: bool,
    pub stream: ResolvedStream,
}

pub type BackendResponse = Result<BackendReply, YtSaveError>;

/// Envelope carried over the actor's channel
#[derive(Debug)]
pub enum BackendCommand {
    Request {
        request: BackendRequest,
        reply: oneshot::Sender<BackendResponse>,
    },
    // System
    Shutdown,
}
