//! HTTP client for the self-hosted downloader API and the account backend

use crate::extractor::models::{
    Credential, ResolvedStream, StreamRequest, UserInfo, VideoId, VideoInfo,
};
use crate::extractor::traits::{AccountService, StreamSource};
use crate::utils::error::{Result, YtSaveError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Route layout of the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFlavor {
    SelfHosted,
    Backend,
}

impl ApiFlavor {
    fn info_path(&self, id: &VideoId) -> String {
        match self {
            ApiFlavor::SelfHosted => format!("/get-video-info/{}", id),
            ApiFlavor::Backend => format!("/api/video/info/{}", id),
        }
    }

    fn download_path(&self, request: &StreamRequest) -> String {
        match (self, request.is_short) {
            (ApiFlavor::SelfHosted, false) => format!(
                "/download_video/{}?quality={}",
                request.video_id, request.quality
            ),
            (ApiFlavor::SelfHosted, true) => format!(
                "/download_short/{}?quality={}",
                request.video_id, request.quality
            ),
            (ApiFlavor::Backend, short) => format!(
                "/api/video/download/{}?quality={}&short={}",
                request.video_id, request.quality, short
            ),
        }
    }
}

/// Body of a download-URL response
#[derive(Debug, Deserialize)]
struct DownloadResponse {
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    reserved_file: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default, rename = "remainingRequests")]
    remaining_requests: Option<u64>,
}

impl DownloadResponse {
    fn into_stream(self) -> Result<ResolvedStream> {
        let download_url = self
            .file
            .or(self.reserved_file)
            .or(self.url)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| YtSaveError::Extraction("No download URL in response".to_string()))?;

        Ok(ResolvedStream {
            download_url,
            approximate_size_bytes: self.size,
            note: self.comment,
            remaining_requests: self.remaining_requests,
        })
    }
}

#[derive(Debug, Serialize)]
struct RegisterBody<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterResponse {
    api_key: String,
}

/// Client for the remote JSON API
pub struct ApiClient {
    client: Client,
    base_url: String,
    flavor: ApiFlavor,
}

impl ApiClient {
    pub fn new(base_url: &str, flavor: ApiFlavor) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("ytsave/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            flavor,
        })
    }

    pub fn flavor(&self) -> ApiFlavor {
        self.flavor
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder, credential: Option<&Credential>) -> Result<RequestBuilder> {
        let credential = credential.ok_or(YtSaveError::MissingCredential)?;
        Ok(builder.header(API_KEY_HEADER, credential.expose()))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        parse_body(status, &body)
    }
}

#[async_trait]
impl StreamSource for ApiClient {
    fn id(&self) -> &'static str {
        match self.flavor {
            ApiFlavor::SelfHosted => "self-hosted",
            ApiFlavor::Backend => "backend",
        }
    }

    async fn video_info(
        &self,
        video_id: &VideoId,
        credential: Option<&Credential>,
    ) -> Result<VideoInfo> {
        let url = self.url(&self.flavor.info_path(video_id));
        debug!("Fetching video info from {}", url);
        let builder = self.authorized(self.client.get(&url), credential)?;
        self.send(builder).await
    }

    async fn resolve(&self, request: &StreamRequest) -> Result<ResolvedStream> {
        let url = self.url(&self.flavor.download_path(request));
        debug!("Resolving stream via {}", url);
        let builder = self.authorized(self.client.get(&url), request.credential.as_ref())?;
        let response: DownloadResponse = self.send(builder).await?;
        response.into_stream()
    }
}

#[async_trait]
impl AccountService for ApiClient {
    async fn register(&self, email: &str, name: &str) -> Result<Credential> {
        let builder = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&RegisterBody { email, name });
        let response: RegisterResponse = self.send(builder).await?;
        Ok(Credential::new(response.api_key))
    }

    async fn user_info(&self, credential: &Credential) -> Result<UserInfo> {
        let builder = self.authorized(self.client.get(self.url("/api/user/info")), Some(credential))?;
        self.send(builder).await
    }
}

/// Pull a human-readable message out of an error body
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error", "message", "detail"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Turn a status code and body into a typed result.
///
/// Non-2xx statuses and 2xx bodies carrying an `error` field are both remote errors.
fn parse_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T> {
    if !(200..300).contains(&status) {
        let err = YtSaveError::remote(status, error_message(body));
        error!("Remote request failed: {}", err);
        return Err(err);
    }

    let value: Value = serde_json::from_str(body)?;
    if let Some(message) = value.get("error").and_then(Value::as_str) {
        error!("Remote service reported an error: {}", message);
        return Err(YtSaveError::remote(status, Some(message.to_string())));
    }

    Ok(serde_json::from_value(value)?)
}
