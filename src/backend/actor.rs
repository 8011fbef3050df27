use super::messages::{BackendCommand, BackendReply, BackendRequest, BackendResponse, StreamSelection};
use crate::extractor::quality::quality_label;
use crate::extractor::{select_from_formats, AccountService, StreamResolver, VideoId, VideoInfo};
use crate::session::CredentialStore;
use crate::utils::error::{Result, YtSaveError};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Background worker answering popup requests one at a time
pub struct BackendActor {
    receiver: mpsc::Receiver<BackendCommand>,

    // Components
    resolver: StreamResolver,
    accounts: Option<Arc<dyn AccountService>>,
    credentials: CredentialStore,
}

impl BackendActor {
    pub fn new(
        receiver: mpsc::Receiver<BackendCommand>,
        resolver: StreamResolver,
        accounts: Option<Arc<dyn AccountService>>,
        credentials: CredentialStore,
    ) -> Self {
        Self {
            receiver,
            resolver,
            accounts,
            credentials,
        }
    }

    /// Start the actor on the tokio runtime and return a handle to it
    pub fn spawn(
        resolver: StreamResolver,
        accounts: Option<Arc<dyn AccountService>>,
        credentials: CredentialStore,
    ) -> BackendHandle {
        let (sender, receiver) = mpsc::channel(16);
        let actor = Self::new(receiver, resolver, accounts, credentials);
        tokio::spawn(actor.run());
        BackendHandle { sender }
    }

    pub async fn run(mut self) {
        info!("BackendActor started ({})", self.resolver.source().id());

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                BackendCommand::Request { request, reply } => {
                    let response = self.handle(request).await;
                    if reply.send(response).is_err() {
                        debug!("Requester went away before the reply");
                    }
                }
                BackendCommand::Shutdown => {
                    info!("BackendActor shutting down");
                    break;
                }
            }
        }
    }

    async fn handle(&self, request: BackendRequest) -> BackendResponse {
        match request {
            BackendRequest::VideoInfo { video_id } => {
                let credential = self.credentials.current().await?;
                let info = self
                    .resolver
                    .source()
                    .video_info(&video_id, credential.as_ref())
                    .await?;
                Ok(BackendReply::VideoInfo(info))
            }
            BackendRequest::VideoStream { video_id, is_short } => self
                .handle_video_stream(video_id, is_short)
                .await
                .map(BackendReply::Stream),
            BackendRequest::Register { email, name } => {
                let accounts = self
                    .accounts
                    .as_ref()
                    .ok_or(YtSaveError::Unsupported("Registration"))?;
                let api_key = accounts.register(&email, &name).await?;
                self.credentials.save(&api_key).await?;
                info!("Registered account for {}", email);
                Ok(BackendReply::Registered { api_key })
            }
            BackendRequest::UserInfo => {
                let accounts = self
                    .accounts
                    .as_ref()
                    .ok_or(YtSaveError::Unsupported("Account info"))?;
                let credential = self.credentials.require().await?;
                let user = accounts.user_info(&credential).await?;
                Ok(BackendReply::UserInfo(user))
            }
        }
    }

    /// Video info, then quality selection, then stream resolution
    async fn handle_video_stream(&self, video_id: VideoId, is_short: bool) -> Result<StreamSelection> {
        // Fetched fresh for every request
        let credential = self.credentials.current().await?;

        let info = self
            .resolver
            .source()
            .video_info(&video_id, credential.as_ref())
            .await?;
        let is_short = is_short || info.is_short();
        let quality = select_from_formats(&info.formats);
        info!(
            "Selected quality {} ({}) for {} ({} formats reported, short: {})",
            quality,
            quality_label(&quality).unwrap_or("unranked"),
            video_id,
            info.formats.len(),
            is_short
        );

        let stream = self
            .resolver
            .resolve(&video_id, &quality, is_short, credential)
            .await?;
        if let Some(remaining) = stream.remaining_requests.or(info.remaining_requests) {
            info!("{} requests remaining on this key", remaining);
        }
        if let Some(tier) = &info.user_tier {
            debug!("Plan tier: {}", tier);
        }

        Ok(StreamSelection {
            quality,
            is_short,
            stream,
        })
    }
}

/// Cloneable sender side of the actor
#[derive(Clone)]
pub struct BackendHandle {
    sender: mpsc::Sender<BackendCommand>,
}

impl BackendHandle {
    /// Send a request and wait for its typed response
    pub async fn request(&self, request: BackendRequest) -> BackendResponse {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(BackendCommand::Request { request, reply })
            .await
            .map_err(|_| YtSaveError::BackendUnavailable)?;
        response.await.map_err(|_| YtSaveError::BackendUnavailable)?
    }

    pub async fn video_info(&self, video_id: VideoId) -> Result<VideoInfo> {
        match self.request(BackendRequest::VideoInfo { video_id }).await? {
            BackendReply::VideoInfo(info) => Ok(info),
            other => Err(unexpected(other)),
        }
    }

    pub async fn video_stream(&self, video_id: VideoId, is_short: bool) -> Result<StreamSelection> {
        match self
            .request(BackendRequest::VideoStream { video_id, is_short })
            .await?
        {
            BackendReply::Stream(selection) => Ok(selection),
            other => Err(unexpected(other)),
        }
    }

    pub async fn register(&self, email: &str, name: &str) -> Result<crate::extractor::Credential> {
        let request = BackendRequest::Register {
            email: email.to_string(),
            name: name.to_string(),
        };
        match self.request(request).await? {
            BackendReply::Registered { api_key } => Ok(api_key),
            other => Err(unexpected(other)),
        }
    }

    pub async fn user_info(&self) -> Result<crate::extractor::UserInfo> {
        match self.request(BackendRequest::UserInfo).await? {
            BackendReply::UserInfo(user) => Ok(user),
            other => Err(unexpected(other)),
        }
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(BackendCommand::Shutdown).await;
    }
}

fn unexpected(reply: BackendReply) -> YtSaveError {
    YtSaveError::Extraction(format!("Unexpected reply from background worker: {:?}", reply))
}
