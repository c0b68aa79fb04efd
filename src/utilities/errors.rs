//! Error types for the evaluation pipeline.
//!
//! Every failure aborts the run. The only "retry" anywhere in the crate is
//! the poller re-checking a handle that is still in a non-terminal state,
//! and that never surfaces as an error.

use std::time::Duration;

use thiserror::Error;

use crate::pipeline::PipelineStage;

/// Maximum number of body bytes echoed into error messages.
const BODY_PREVIEW_LIMIT: usize = 2000;

/// Result alias used throughout the crate.
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors produced while uploading, polling or evaluating a video.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Missing credential, unreadable video file or invalid setting.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The upload endpoint answered with a non-success status.
    #[error("Upload failed ({status}): {}", preview(.body))]
    Upload { status: u16, body: String },

    /// A response body was not JSON, or lacked a required field.
    #[error("Malformed {stage} response: {message}. Body: {}", preview(.body))]
    MalformedResponse {
        stage: PipelineStage,
        message: String,
        body: String,
    },

    /// The remote reported an error while the handle was being looked up.
    #[error("Error checking file state ({status}): {}", preview(.body))]
    Lookup { status: u16, body: String },

    /// The remote marked the uploaded media as FAILED.
    #[error("File processing failed for {name}")]
    ProcessingFailed { name: String },

    /// The handle never became ACTIVE within the wait budget.
    #[error("Timeout: file never became ACTIVE (waited {waited:?}, budget {budget:?})")]
    Timeout { waited: Duration, budget: Duration },

    /// The generation endpoint answered with a non-success status.
    #[error("Generation request failed ({status}): {}", preview(.body))]
    Generation { status: u16, body: String },

    /// The evaluation request could not be encoded as JSON.
    #[error("Could not encode evaluation request: {source}")]
    RequestEncoding {
        #[source]
        source: serde_json::Error,
    },

    /// Connection, TLS or body-read failure below the HTTP status level.
    #[error("HTTP transport error during {stage}: {source}")]
    Transport {
        stage: PipelineStage,
        #[source]
        source: reqwest::Error,
    },

    /// Local I/O failure (opening the video file, starting a runtime).
    #[error("I/O error during {stage}: {source}")]
    Io {
        stage: PipelineStage,
        #[source]
        source: std::io::Error,
    },
}

impl EvalError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a malformed-response error for the given stage.
    pub fn malformed(
        stage: PipelineStage,
        message: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::MalformedResponse {
            stage,
            message: message.into(),
            body: body.into(),
        }
    }

    /// Create an I/O error for the given stage.
    pub fn io(stage: PipelineStage, source: std::io::Error) -> Self {
        Self::Io { stage, source }
    }

    /// The pipeline stage this error belongs to.
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Configuration { .. } => PipelineStage::Start,
            Self::Upload { .. } => PipelineStage::Uploading,
            Self::MalformedResponse { stage, .. }
            | Self::Transport { stage, .. }
            | Self::Io { stage, .. } => *stage,
            Self::Lookup { .. } | Self::ProcessingFailed { .. } | Self::Timeout { .. } => {
                PipelineStage::Polling
            }
            Self::Generation { .. } | Self::RequestEncoding { .. } => PipelineStage::Evaluating,
        }
    }

    /// The raw remote payload attached to this error, if any.
    pub fn remote_body(&self) -> Option<&str> {
        match self {
            Self::Upload { body, .. }
            | Self::MalformedResponse { body, .. }
            | Self::Lookup { body, .. }
            | Self::Generation { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }
}

fn preview(body: &str) -> &str {
    if body.len() <= BODY_PREVIEW_LIMIT {
        return body;
    }
    let mut end = BODY_PREVIEW_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
