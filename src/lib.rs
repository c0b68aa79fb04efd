//! # speaker-eval
//!
//! Uploads a video to the Gemini Files API, waits until the remote has
//! processed it, then asks a Gemini model for a schema-constrained
//! evaluation of the speaker's communication style.
//!
//! The run is a strict sequence of three components:
//!
//! - [`media::Uploader`] - one multipart upload, returns the first handle snapshot
//! - [`media::StatePoller`] - re-fetches the handle with capped exponential backoff
//! - [`evaluation::Evaluator`] - one `generateContent` request with the rubric and schema
//!
//! [`pipeline::Pipeline`] wires them together behind a validated
//! [`config::EvalConfig`].

pub mod config;
pub mod evaluation;
pub mod media;
pub mod pipeline;
pub mod transport;
pub mod utilities;

pub use config::EvalConfig;
pub use evaluation::{EvaluationOutput, Evaluator, SpeakingReport};
pub use media::{ActiveMedia, MediaHandle, PollPolicy, ProcessingState, StatePoller, Uploader};
pub use pipeline::{Pipeline, PipelineStage, RunReport};
pub use transport::{GeminiTransport, MediaTransport, RawResponse, VideoSource};
pub use utilities::errors::{EvalError, EvalResult};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
