use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use tracing::{debug, info, warn};

use super::types::{
    ErrorBody, FetchRequest, FetchResponse, HealthStatus, UploadPreferences, VideoSource,
};
use crate::commentary::types::CommentaryPayload;
use crate::config::BackendConfig;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Non-2xx response; `message` is the server's `error` string verbatim.
    #[error("backend rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("backend response was malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    config: BackendConfig,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            config: config.clone(),
        }
    }

    /// Absolute URL for a server-relative media locator.
    pub fn resolve_media(&self, locator: &str) -> String {
        self.config.resolve_media(locator)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.origin.trim_end_matches('/'), path)
    }

    /// Run the full analysis + narration pipeline for one video.
    pub async fn generate_commentary(
        &self,
        source: VideoSource,
        prefs: &UploadPreferences,
    ) -> Result<CommentaryPayload, BackendError> {
        let form = Form::new()
            .text("style", prefs.style.clone())
            .text("energy", prefs.energy.clone())
            .text("voice", prefs.voice.clone())
            .text("duration", prefs.duration.clone());

        let form = match source {
            VideoSource::File(file) => {
                info!(name = %file.name, bytes = file.bytes.len(), "uploading video for commentary");
                let part = Part::bytes(file.bytes)
                    .file_name(file.name)
                    .mime_str(&file.mime)?;
                form.part("video", part)
            }
            VideoSource::Stored { filename } => {
                info!(%filename, "requesting commentary for stored video");
                form.text("video_filename", filename)
            }
        };

        let response = self
            .client
            .post(self.url("/api/generate-full-commentary"))
            .multipart(form)
            .send()
            .await?;
        let payload: CommentaryPayload = decode(response).await?;

        debug!(
            segments = payload.audio_segments.as_ref().map_or(0, Vec::len),
            has_audio = payload.has_audio.unwrap_or(false),
            "commentary generated"
        );
        Ok(payload)
    }

    /// Have the backend download a remote video; returns its stored filename.
    pub async fn fetch_remote(&self, url: &str) -> Result<FetchResponse, BackendError> {
        info!(%url, "asking backend to fetch remote video");
        let response = self
            .client
            .post(self.url("/api/fetch-video"))
            .json(&FetchRequest { url })
            .send()
            .await?;
        decode(response).await
    }

    pub async fn health(&self) -> Result<HealthStatus, BackendError> {
        let response = self.client.get(self.url("/api/health")).send().await?;
        decode(response).await
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                } else {
                    body.clone()
                }
            });
        warn!(status = status.as_u16(), %message, "backend returned an error");
        return Err(BackendError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_str(&body)?)
}
