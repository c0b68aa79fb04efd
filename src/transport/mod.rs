//! HTTP seam between the pipeline and the Gemini REST API.
//!
//! The [`MediaTransport`] trait returns raw status + body pairs. Status
//! checks, JSON parsing and shape normalization all live in the components
//! that call it, so they behave the same against the real
//! [`GeminiTransport`] and the scripted fake used in tests.

pub mod gemini;

#[cfg(test)]
pub(crate) mod fakes;

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::utilities::errors::EvalResult;

pub use gemini::GeminiTransport;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// A validated local video file ready to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSource {
    path: PathBuf,
    file_name: String,
    mime_type: String,
    size: u64,
}

impl VideoSource {
    pub(crate) fn new(path: PathBuf, file_name: String, mime_type: String, size: u64) -> Self {
        Self {
            path,
            file_name,
            mime_type,
            size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Size in bytes at validation time.
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl fmt::Display for VideoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {} bytes)", self.path.display(), self.mime_type, self.size)
    }
}

/// The three remote calls a run makes.
///
/// Implementations return `Err` only for failures below the HTTP layer
/// (connection, TLS, local I/O). Any response that arrived, whatever its
/// status, is returned as a [`RawResponse`].
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Multipart-upload the video file.
    async fn upload_file(&self, video: &VideoSource) -> EvalResult<RawResponse>;

    /// Read-only lookup of a handle by name (`files/abc123`).
    async fn get_file(&self, name: &str) -> EvalResult<RawResponse>;

    /// Send one `generateContent` request for `model`.
    async fn generate_content(&self, model: &str, body: &Value) -> EvalResult<RawResponse>;
}
