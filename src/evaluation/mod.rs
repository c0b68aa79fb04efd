//! Speaking-style evaluation via one structured `generateContent` call.
//!
//! - [`rubric`] - fixed system instruction and user prompt
//! - [`schema`] - strict response schema
//! - [`request`] - request body types
//! - [`response`] - response body types
//! - [`report`] - typed view of the returned JSON

pub mod report;
pub mod request;
pub mod response;
pub mod rubric;
pub mod schema;

use std::sync::Arc;

use serde_json::Value;

pub use report::SpeakingReport;
pub use request::EvaluationRequest;
pub use response::EvaluationResponse;

use crate::media::ActiveMedia;
use crate::pipeline::PipelineStage;
use crate::transport::MediaTransport;
use crate::utilities::errors::{EvalError, EvalResult};

/// What the evaluation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationOutput {
    /// Text parts from the candidates, in order.
    Text {
        parts: Vec<String>,
        /// Parsed report, when the text is valid report JSON.
        report: Option<SpeakingReport>,
    },
    /// No candidates or no text; the whole parsed response.
    Raw(Value),
}

impl EvaluationOutput {
    /// Build the output from a parsed response body.
    pub fn from_response(json: Value) -> Self {
        let parts = serde_json::from_value::<EvaluationResponse>(json.clone())
            .map(|r| r.text_parts())
            .unwrap_or_default();
        if parts.is_empty() {
            return Self::Raw(json);
        }
        let report = SpeakingReport::from_text(&parts.concat());
        Self::Text { parts, report }
    }

    /// Printable form: one text part per line, or pretty-printed JSON.
    pub fn render(&self) -> String {
        match self {
            Self::Text { parts, .. } => parts.join("\n"),
            Self::Raw(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }

    pub fn report(&self) -> Option<&SpeakingReport> {
        match self {
            Self::Text { report, .. } => report.as_ref(),
            Self::Raw(_) => None,
        }
    }
}

/// Sends the evaluation request for ready media.
#[derive(Clone)]
pub struct Evaluator {
    transport: Arc<dyn MediaTransport>,
    model: String,
}

impl Evaluator {
    pub fn new(transport: Arc<dyn MediaTransport>, model: impl Into<String>) -> Self {
        Self {
            transport,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run the evaluation. Single attempt, no retries.
    pub async fn evaluate(&self, media: &ActiveMedia) -> EvalResult<EvaluationOutput> {
        let body = EvaluationRequest::new(media).to_json()?;
        log::info!("Requesting evaluation of {} from {}", media.uri(), self.model);

        let response = self
            .transport
            .generate_content(&self.model, &body)
            .await?;

        if !response.is_success() {
            return Err(EvalError::Generation {
                status: response.status,
                body: response.body,
            });
        }

        let json: Value = response.json().map_err(|e| {
            EvalError::malformed(
                PipelineStage::Evaluating,
                format!("generation response is not JSON: {}", e),
                response.body.clone(),
            )
        })?;

        if let Some(usage) = json.get("usageMetadata") {
            log::debug!("Gemini usage: {}", usage);
        }

        let output = EvaluationOutput::from_response(json);
        if let Some(report) = output.report() {
            for issue in report.score_issues() {
                log::warn!(
                    "Report score {}.{}: {:?}",
                    issue.category,
                    issue.criterion,
                    issue.problem
                );
            }
        } else if matches!(output, EvaluationOutput::Text { .. }) {
            log::warn!("Evaluation text did not parse as a report; showing it verbatim");
        }
        Ok(output)
    }
}
