//! Scripted in-memory transport for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{MediaTransport, RawResponse, VideoSource};
use crate::utilities::errors::EvalResult;

/// One recorded call against [`FakeTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Upload { file_name: String },
    GetFile { name: String },
    Generate { model: String, body: Value },
}

/// Replays queued responses and records every call it receives.
///
/// Running out of queued responses for an endpoint panics, which makes an
/// unexpected extra request fail the test loudly.
#[derive(Debug, Default)]
pub struct FakeTransport {
    uploads: Mutex<VecDeque<RawResponse>>,
    lookups: Mutex<VecDeque<RawResponse>>,
    generations: Mutex<VecDeque<RawResponse>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_upload(self, status: u16, body: impl Into<String>) -> Self {
        self.uploads
            .lock()
            .unwrap()
            .push_back(RawResponse::new(status, body));
        self
    }

    pub fn with_lookup(self, status: u16, body: impl Into<String>) -> Self {
        self.lookups
            .lock()
            .unwrap()
            .push_back(RawResponse::new(status, body));
        self
    }

    pub fn with_generation(self, status: u16, body: impl Into<String>) -> Self {
        self.generations
            .lock()
            .unwrap()
            .push_back(RawResponse::new(status, body));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn lookup_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::GetFile { .. }))
            .count()
    }

    pub fn generation_bodies(&self) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Generate { body, .. } => Some(body),
                _ => None,
            })
            .collect()
    }

    fn next(queue: &Mutex<VecDeque<RawResponse>>, endpoint: &str) -> RawResponse {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected {} request: no scripted response left", endpoint))
    }
}

#[async_trait]
impl MediaTransport for FakeTransport {
    async fn upload_file(&self, video: &VideoSource) -> EvalResult<RawResponse> {
        self.calls.lock().unwrap().push(Call::Upload {
            file_name: video.file_name().to_string(),
        });
        Ok(Self::next(&self.uploads, "upload"))
    }

    async fn get_file(&self, name: &str) -> EvalResult<RawResponse> {
        self.calls.lock().unwrap().push(Call::GetFile {
            name: name.to_string(),
        });
        Ok(Self::next(&self.lookups, "lookup"))
    }

    async fn generate_content(&self, model: &str, body: &Value) -> EvalResult<RawResponse> {
        self.calls.lock().unwrap().push(Call::Generate {
            model: model.to_string(),
            body: body.clone(),
        });
        Ok(Self::next(&self.generations, "generateContent"))
    }
}

/// A video source that never touches the filesystem.
pub fn sample_video() -> VideoSource {
    VideoSource::new(
        "sample.mp4".into(),
        "sample.mp4".to_string(),
        "video/mp4".to_string(),
        1024,
    )
}
