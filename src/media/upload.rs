//! Single-shot multipart upload of the local video.

use std::sync::Arc;

use super::MediaHandle;
use crate::pipeline::PipelineStage;
use crate::transport::{MediaTransport, VideoSource};
use crate::utilities::errors::{EvalError, EvalResult};

/// Uploads a video and returns the remote's first handle snapshot.
///
/// The upload is attempted exactly once.
#[derive(Clone)]
pub struct Uploader {
    transport: Arc<dyn MediaTransport>,
}

impl Uploader {
    pub fn new(transport: Arc<dyn MediaTransport>) -> Self {
        Self { transport }
    }

    /// Upload `video`.
    ///
    /// The returned handle always has a `name`; its state is whatever the
    /// remote reported, usually `PROCESSING`.
    pub async fn upload(&self, video: &VideoSource) -> EvalResult<MediaHandle> {
        log::info!("Uploading {}", video);
        let response = self.transport.upload_file(video).await?;

        if !response.is_success() {
            return Err(EvalError::Upload {
                status: response.status,
                body: response.body,
            });
        }

        let json = response.json().map_err(|e| {
            EvalError::malformed(
                PipelineStage::Uploading,
                format!("upload response is not JSON: {}", e),
                response.body.clone(),
            )
        })?;

        let handle = MediaHandle::from_wire(&json).ok_or_else(|| {
            EvalError::malformed(
                PipelineStage::Uploading,
                "upload response is not a JSON object",
                response.body.clone(),
            )
        })?;

        let name = match handle.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                return Err(EvalError::malformed(
                    PipelineStage::Uploading,
                    "upload response has no file name",
                    response.body,
                ))
            }
        };
        log::info!(
            "Upload complete: name={}, state={}",
            name,
            handle.state_or_unknown()
        );
        Ok(handle)
    }
}
