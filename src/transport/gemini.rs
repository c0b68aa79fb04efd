//! Gemini REST transport over `reqwest`.
//!
//! Every request carries the API key in the `key` query parameter. The
//! transport performs no retries and no backoff of its own.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use super::{MediaTransport, RawResponse, VideoSource};
use crate::config::EvalConfig;
use crate::pipeline::PipelineStage;
use crate::utilities::errors::{EvalError, EvalResult};

/// REST API version segment.
pub const API_VERSION: &str = "v1beta";

/// `reqwest`-backed [`MediaTransport`] for the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiTransport {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl GeminiTransport {
    /// Build a transport from a validated configuration.
    pub fn new(config: &EvalConfig) -> EvalResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|source| EvalError::Transport {
                stage: PipelineStage::Start,
                source,
            })?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/{}/files", self.api_base, API_VERSION)
    }

    fn file_url(&self, name: &str) -> String {
        format!("{}/{}/{}", self.api_base, API_VERSION, name)
    }

    fn generate_url(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!(
            "{}/{}/models/{}:generateContent",
            self.api_base, API_VERSION, model
        )
    }

    async fn finish(
        stage: PipelineStage,
        response: Result<reqwest::Response, reqwest::Error>,
    ) -> EvalResult<RawResponse> {
        let response = response.map_err(|source| EvalError::Transport { stage, source })?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|source| EvalError::Transport { stage, source })?;
        log::debug!("{} response: status={}, {} bytes", stage, status, body.len());
        Ok(RawResponse { status, body })
    }
}

#[async_trait]
impl MediaTransport for GeminiTransport {
    async fn upload_file(&self, video: &VideoSource) -> EvalResult<RawResponse> {
        let file = tokio::fs::File::open(video.path())
            .await
            .map_err(|e| EvalError::io(PipelineStage::Uploading, e))?;
        let part = Part::stream_with_length(reqwest::Body::from(file), video.size())
            .file_name(video.file_name().to_string())
            .mime_str(video.mime_type())
            .map_err(|source| EvalError::Transport {
                stage: PipelineStage::Uploading,
                source,
            })?;
        let form = Form::new().part("file", part);

        log::debug!("POST {} ({})", self.upload_url(), video);
        let response = self
            .client
            .post(self.upload_url())
            .query(&[("key", self.api_key.as_str())])
            .multipart(form)
            .send()
            .await;
        Self::finish(PipelineStage::Uploading, response).await
    }

    async fn get_file(&self, name: &str) -> EvalResult<RawResponse> {
        let url = self.file_url(name);
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await;
        Self::finish(PipelineStage::Polling, response).await
    }

    async fn generate_content(&self, model: &str, body: &Value) -> EvalResult<RawResponse> {
        let url = self.generate_url(model);
        log::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await;
        Self::finish(PipelineStage::Evaluating, response).await
    }
}
