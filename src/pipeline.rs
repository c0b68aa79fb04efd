//! Upload → poll → evaluate, strictly in sequence.
//!
//! ```text
//! START → UPLOADING → POLLING → EVALUATING → DONE
//!   └──────────┴──────────┴──────────┴──→ FAILED(stage, reason)
//! ```
//!
//! Any error ends the run. There is no partial recovery and no resuming of a
//! previously uploaded handle.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EvalConfig;
use crate::evaluation::{EvaluationOutput, Evaluator};
use crate::media::{StatePoller, Uploader};
use crate::transport::{GeminiTransport, MediaTransport};
use crate::utilities::errors::{EvalError, EvalResult};
use crate::utilities::logger::ProgressLogger;

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// States of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    Start,
    Uploading,
    Polling,
    Evaluating,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Uploading => "UPLOADING",
            Self::Polling => "POLLING",
            Self::Evaluating => "EVALUATING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }

    /// The stage that follows on success. Terminal stages map to themselves.
    pub fn next(&self) -> Self {
        match self {
            Self::Start => Self::Uploading,
            Self::Uploading => Self::Polling,
            Self::Polling => Self::Evaluating,
            Self::Evaluating => Self::Done,
            Self::Done => Self::Done,
            Self::Failed => Self::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label().to_lowercase())
    }
}

// ---------------------------------------------------------------------------
// Run result
// ---------------------------------------------------------------------------

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Identifier used in log lines for this run.
    pub run_id: Uuid,
    /// Remote handle name, e.g. `files/abc123`.
    pub file_name: String,
    /// Resource URI the evaluation referenced.
    pub file_uri: String,
    /// Evaluation text or raw response.
    pub output: EvaluationOutput,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// One evaluation run over a single video.
pub struct Pipeline {
    config: EvalConfig,
    transport: Arc<dyn MediaTransport>,
    progress: ProgressLogger,
}

impl Pipeline {
    /// Pipeline talking to the Gemini API described by `config`.
    pub fn new(config: EvalConfig) -> EvalResult<Self> {
        let transport = Arc::new(GeminiTransport::new(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Pipeline over an arbitrary transport.
    pub fn with_transport(config: EvalConfig, transport: Arc<dyn MediaTransport>) -> Self {
        Self {
            config,
            transport,
            progress: ProgressLogger::default(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressLogger) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Execute the run.
    pub async fn run(&self) -> EvalResult<RunReport> {
        let run_id = Uuid::new_v4();
        let result = self.run_stages(run_id).await;
        match &result {
            Ok(_) => log::info!("run {}: {}", run_id, PipelineStage::Done),
            Err(e) => {
                log::error!(
                    "run {}: {} during {}: {}",
                    run_id,
                    PipelineStage::Failed,
                    e.stage(),
                    e
                );
                self.progress.failed(e);
            }
        }
        result
    }

    /// Execute the run on a fresh Tokio runtime, blocking the calling thread.
    pub fn run_blocking(&self) -> EvalResult<RunReport> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| EvalError::io(PipelineStage::Start, e))?;
        rt.block_on(self.run())
    }

    async fn run_stages(&self, run_id: Uuid) -> EvalResult<RunReport> {
        let mut stage = PipelineStage::Start;
        let video = self.config.validate()?;
        log::info!("run {}: validated {}", run_id, video);

        stage = self.advance(run_id, stage);
        self.progress.begin(stage, "Uploading video...");
        let handle = Uploader::new(self.transport.clone()).upload(&video).await?;
        let file_name = handle
            .name
            .clone()
            .ok_or_else(|| EvalError::malformed(stage, "upload response has no file name", ""))?;
        self.progress.done(
            stage,
            &format!("Upload complete: {} ({})", file_name, handle.state_or_unknown()),
        );

        stage = self.advance(run_id, stage);
        self.progress.begin(
            stage,
            &format!("File state = {}. Waiting for ACTIVE...", handle.state_or_unknown()),
        );
        let progress = self.progress.clone();
        let media = StatePoller::new(self.transport.clone(), self.config.poll)
            .with_observer(move |attempt| progress.poll(attempt))
            .wait_until_active(&file_name)
            .await?;
        self.progress.done(stage, "File is ACTIVE");

        stage = self.advance(run_id, stage);
        self.progress.begin(stage, "Sending evaluation request...");
        let output = Evaluator::new(self.transport.clone(), self.config.model.clone())
            .evaluate(&media)
            .await?;
        self.progress.done(stage, "Evaluation received");

        self.advance(run_id, stage);
        Ok(RunReport {
            run_id,
            file_name,
            file_uri: media.uri().to_string(),
            output,
        })
    }

    fn advance(&self, run_id: Uuid, from: PipelineStage) -> PipelineStage {
        let to = from.next();
        log::debug!("run {}: {} -> {}", run_id, from, to);
        to
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    use serde_json::json;
    use tokio_test::assert_ok;

    use crate::media::PollPolicy;
    use crate::transport::fakes::{Call, FakeTransport};

    struct Fixture {
        _video: tempfile::NamedTempFile,
        config: EvalConfig,
    }

    fn fixture() -> Fixture {
        let mut video = tempfile::Builder::new().suffix(".mp4").tempfile().unwrap();
        video.write_all(b"fake mp4 bytes").unwrap();
        let config = EvalConfig::builder(video.path())
            .api_key("test-key")
            .poll(PollPolicy::default())
            .build();
        Fixture {
            _video: video,
            config,
        }
    }

    fn pipeline(config: EvalConfig, transport: Arc<FakeTransport>) -> Pipeline {
        Pipeline::with_transport(config, transport).with_progress(ProgressLogger::silent())
    }

    #[test]
    fn test_stage_progression() {
        let mut stage = PipelineStage::Start;
        let mut seen = vec![stage];
        while !stage.is_terminal() {
            stage = stage.next();
            seen.push(stage);
        }
        assert_eq!(
            seen,
            vec![
                PipelineStage::Start,
                PipelineStage::Uploading,
                PipelineStage::Polling,
                PipelineStage::Evaluating,
                PipelineStage::Done,
            ]
        );
        assert_eq!(PipelineStage::Failed.next(), PipelineStage::Failed);
        assert_eq!(PipelineStage::Polling.to_string(), "polling");
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_processing_then_active() {
        let fx = fixture();
        let generation = json!({
            "candidates": [{"content": {"parts": [{"text": "{\"video_id\": \"files/v1\", \"summary\": \"Solid.\"}"}]}}]
        });
        let transport = Arc::new(
            FakeTransport::new()
                .with_upload(200, r#"{"file": {"name": "files/v1", "state": "PROCESSING"}}"#)
                .with_lookup(200, r#"{"file": {"name": "files/v1", "state": "PROCESSING"}}"#)
                .with_lookup(
                    200,
                    r#"{"file": {"name": "files/v1", "state": "ACTIVE", "uri": "https://generativelanguage.googleapis.com/v1beta/files/v1"}}"#,
                )
                .with_generation(200, generation.to_string()),
        );

        let report = assert_ok!(pipeline(fx.config, transport.clone()).run().await);

        assert_eq!(report.file_name, "files/v1");
        assert_eq!(
            report.file_uri,
            "https://generativelanguage.googleapis.com/v1beta/files/v1"
        );
        assert_eq!(
            report.output.report().and_then(|r| r.summary.as_deref()),
            Some("Solid.")
        );

        let calls = transport.calls();
        assert!(matches!(calls[0], Call::Upload { .. }));
        assert_eq!(
            calls[1],
            Call::GetFile {
                name: "files/v1".into()
            }
        );
        assert_eq!(transport.lookup_count(), 2);
        let bodies = transport.generation_bodies();
        assert_eq!(bodies.len(), 1);
        assert_eq!(
            bodies[0]["contents"][0]["parts"][0]["fileData"]["fileUri"],
            "https://generativelanguage.googleapis.com/v1beta/files/v1"
        );
        match &calls[3] {
            Call::Generate { model, .. } => assert_eq!(model, "gemini-2.5-flash"),
            other => panic!("expected generate call, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_processing_sends_no_generation() {
        let fx = fixture();
        let transport = Arc::new(
            FakeTransport::new()
                .with_upload(200, r#"{"file": {"name": "files/v1", "state": "PROCESSING"}}"#)
                .with_lookup(200, r#"{"file": {"state": "FAILED"}}"#),
        );

        let err = pipeline(fx.config, transport.clone()).run().await.unwrap_err();

        assert!(matches!(err, EvalError::ProcessingFailed { .. }));
        assert_eq!(err.stage(), PipelineStage::Polling);
        assert!(transport.generation_bodies().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_500_aborts_with_body() {
        let fx = fixture();
        let transport = Arc::new(
            FakeTransport::new()
                .with_upload(200, r#"{"name": "files/v1", "state": "ACTIVE"}"#)
                .with_lookup(
                    200,
                    r#"{"name": "files/v1", "state": "ACTIVE", "uri": "https://example.test/files/v1"}"#,
                )
                .with_generation(500, r#"{"error": {"code": 500, "message": "boom"}}"#),
        );

        let err = pipeline(fx.config, transport).run().await.unwrap_err();

        match err {
            EvalError::Generation { status, ref body } => {
                assert_eq!(status, 500);
                assert!(body.contains("boom"));
            }
            ref other => panic!("expected generation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_network_call() {
        let fx = fixture();
        let mut config = fx.config.clone();
        config.api_key = String::new();
        let transport = Arc::new(FakeTransport::new());

        let err = pipeline(config, transport.clone()).run().await.unwrap_err();

        assert!(matches!(err, EvalError::Configuration { .. }));
        assert_eq!(err.stage(), PipelineStage::Start);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_upload_failure_stops_before_polling() {
        let fx = fixture();
        let transport = Arc::new(FakeTransport::new().with_upload(400, "bad request"));

        let err = pipeline(fx.config, transport.clone()).run().await.unwrap_err();

        assert!(matches!(err, EvalError::Upload { status: 400, .. }));
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_aborts_run() {
        let fx = fixture();
        let config = EvalConfig {
            poll: PollPolicy {
                max_wait: Duration::from_secs(5),
                ..PollPolicy::default()
            },
            ..fx.config.clone()
        };
        let transport = Arc::new(
            FakeTransport::new()
                .with_upload(200, r#"{"file": {"name": "files/v1", "state": "PROCESSING"}}"#)
                .with_lookup(200, r#"{"file": {"name": "files/v1", "state": "PROCESSING"}}"#)
                .with_lookup(200, r#"{"file": {"name": "files/v1", "state": "PROCESSING"}}"#),
        );

        let err = pipeline(config, transport.clone()).run().await.unwrap_err();

        assert!(matches!(err, EvalError::Timeout { .. }));
        assert!(transport.generation_bodies().is_empty());
    }

    #[test]
    fn test_run_blocking_drives_the_async_run() {
        let fx = fixture();
        let transport = Arc::new(
            FakeTransport::new()
                .with_upload(
                    200,
                    r#"{"name": "files/v1", "state": "ACTIVE", "uri": "https://example.test/files/v1"}"#,
                )
                .with_lookup(
                    200,
                    r#"{"name": "files/v1", "state": "ACTIVE", "uri": "https://example.test/files/v1"}"#,
                )
                .with_generation(200, r#"{"candidates": []}"#),
        );

        let report = pipeline(fx.config, transport).run_blocking().unwrap();
        assert!(matches!(report.output, EvaluationOutput::Raw(_)));
    }
}
