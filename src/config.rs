//! Run configuration.
//!
//! A single [`EvalConfig`] value is built up front (from the environment,
//! the CLI, or [`EvalConfigBuilder`]) and validated once before any network
//! call. Components receive what they need from it at construction.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::media::PollPolicy;
use crate::transport::VideoSource;
use crate::utilities::errors::{EvalError, EvalResult};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default generation model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default API host.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Default per-request HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Environment variable overriding the model.
pub const MODEL_ENV_VAR: &str = "GEMINI_MODEL";

// ---------------------------------------------------------------------------
// EvalConfig
// ---------------------------------------------------------------------------

/// Everything a run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Static API key sent as the `key` query parameter.
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Local video to upload.
    pub video_path: PathBuf,
    /// Model used for the evaluation request.
    pub model: String,
    /// API host, without a version segment.
    pub api_base: String,
    /// MIME type override; guessed from the extension when `None`.
    pub mime_type: Option<String>,
    /// Polling budget and backoff.
    pub poll: PollPolicy,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

impl EvalConfig {
    /// Start a builder for `video_path`.
    pub fn builder(video_path: impl Into<PathBuf>) -> EvalConfigBuilder {
        EvalConfigBuilder::new(video_path)
    }

    /// Configuration for `video_path` with the key and model taken from the
    /// environment. A missing key is reported by [`EvalConfig::validate`].
    pub fn from_env(video_path: impl Into<PathBuf>) -> Self {
        let mut builder = Self::builder(video_path);
        if let Some(key) = api_key_from_env() {
            builder = builder.api_key(key);
        }
        if let Ok(model) = std::env::var(MODEL_ENV_VAR) {
            if !model.trim().is_empty() {
                builder = builder.model(model);
            }
        }
        builder.build()
    }

    /// Check the credential, the video file and the numeric settings.
    ///
    /// On success returns the [`VideoSource`] to upload. Nothing here touches
    /// the network.
    pub fn validate(&self) -> EvalResult<VideoSource> {
        if self.api_key.trim().is_empty() {
            return Err(EvalError::configuration(format!(
                "missing API key: pass --api-key or set {}",
                API_KEY_ENV_VARS.join(" or ")
            )));
        }
        if self.model.trim().is_empty() {
            return Err(EvalError::configuration("model name is empty"));
        }
        if !(self.api_base.starts_with("http://") || self.api_base.starts_with("https://")) {
            return Err(EvalError::configuration(format!(
                "api base must be an http(s) URL, got {:?}",
                self.api_base
            )));
        }
        self.poll.validate()?;

        let metadata = std::fs::metadata(&self.video_path).map_err(|e| {
            EvalError::configuration(format!(
                "video file {} is not accessible: {}",
                self.video_path.display(),
                e
            ))
        })?;
        if !metadata.is_file() {
            return Err(EvalError::configuration(format!(
                "video path {} is not a regular file",
                self.video_path.display()
            )));
        }
        File::open(&self.video_path).map_err(|e| {
            EvalError::configuration(format!(
                "video file {} is not readable: {}",
                self.video_path.display(),
                e
            ))
        })?;

        let file_name = self
            .video_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        let mime_type = self
            .mime_type
            .clone()
            .unwrap_or_else(|| guess_mime_type(&self.video_path).to_string());

        Ok(VideoSource::new(
            self.video_path.clone(),
            file_name,
            mime_type,
            metadata.len(),
        ))
    }
}

/// First non-blank API key from [`API_KEY_ENV_VARS`].
pub fn api_key_from_env() -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.trim().is_empty())
}

/// MIME type for a video path, by extension. Defaults to `video/mp4`.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("mpeg") | Some("mpg") => "video/mpeg",
        Some("wmv") => "video/x-ms-wmv",
        Some("flv") => "video/x-flv",
        Some("3gp") => "video/3gpp",
        _ => "video/mp4",
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`EvalConfig`].
#[derive(Debug, Clone)]
pub struct EvalConfigBuilder {
    api_key: String,
    video_path: PathBuf,
    model: String,
    api_base: String,
    mime_type: Option<String>,
    poll: PollPolicy,
    request_timeout: Duration,
}

impl EvalConfigBuilder {
    pub fn new(video_path: impl Into<PathBuf>) -> Self {
        Self {
            api_key: String::new(),
            video_path: video_path.into(),
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            mime_type: None,
            poll: PollPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Shorthand for replacing only the poll budget.
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.poll.max_wait = max_wait;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn build(self) -> EvalConfig {
        EvalConfig {
            api_key: self.api_key,
            video_path: self.video_path,
            model: self.model,
            api_base: self.api_base,
            mime_type: self.mime_type,
            poll: self.poll,
            request_timeout: self.request_timeout,
        }
    }
}
