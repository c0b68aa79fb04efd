//! speaker-eval command-line binary.
//!
//! Uploads one video, waits for it to become ACTIVE, and prints the
//! speaking-style evaluation to stdout.
//!
//! # Environment Variables
//!
//! - `GEMINI_API_KEY` / `GOOGLE_API_KEY` - API key (unless `--api-key` is given)
//! - `GEMINI_MODEL` - model override (default: gemini-2.5-flash)
//! - `RUST_LOG` - tracing filter (default: "warn,speaker_eval=info")
//!
//! # Usage
//!
//! ```bash
//! speaker-eval talk.mp4
//! speaker-eval talk.mov --model gemini-1.5-flash --max-wait 300 -v
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use speaker_eval::config::{api_key_from_env, EvalConfig, DEFAULT_API_BASE, DEFAULT_MODEL};
use speaker_eval::utilities::logger::ProgressLogger;
use speaker_eval::{EvalError, Pipeline};

#[derive(Debug, Parser)]
#[command(
    name = "speaker-eval",
    version,
    about = "Evaluate a speaker's communication style from a video"
)]
struct Cli {
    /// Video file to upload.
    video: PathBuf,

    /// Gemini model used for the evaluation.
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// API key. Falls back to GOOGLE_API_KEY when GEMINI_API_KEY is unset.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Maximum seconds to wait for the upload to become ACTIVE.
    #[arg(long, default_value_t = 180)]
    max_wait: u64,

    /// API host.
    #[arg(long, default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// MIME type override for the upload.
    #[arg(long)]
    mime_type: Option<String>,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, default_value_t = 120)]
    timeout: u64,

    /// Timestamped progress lines and debug logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> EvalConfig {
        let mut builder = EvalConfig::builder(self.video)
            .model(self.model)
            .api_base(self.api_base)
            .max_wait(Duration::from_secs(self.max_wait))
            .request_timeout(Duration::from_secs(self.timeout));
        if let Some(key) = self.api_key.or_else(api_key_from_env) {
            builder = builder.api_key(key);
        }
        if let Some(mime) = self.mime_type {
            builder = builder.mime_type(mime);
        }
        builder.build()
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "info,speaker_eval=debug"
    } else {
        "warn,speaker_eval=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let verbose = cli.verbose;
    match run(cli.into_config(), verbose) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(eval) = e.downcast_ref::<EvalError>() {
                tracing::error!(stage = %eval.stage(), "{:#}", e);
                if let Some(body) = full_remote_body(eval, verbose) {
                    tracing::debug!(stage = %eval.stage(), "remote body: {}", body);
                }
            } else {
                tracing::error!("{:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

/// Untruncated remote payload, logged only in verbose mode. `Display` on
/// [`EvalError`] shortens long bodies.
fn full_remote_body(err: &EvalError, verbose: bool) -> Option<&str> {
    err.remote_body().filter(|_| verbose)
}

fn run(config: EvalConfig, verbose: bool) -> anyhow::Result<()> {
    tracing::info!(
        video = %config.video_path.display(),
        model = %config.model,
        "speaker-eval {}",
        speaker_eval::VERSION
    );

    let video_path = config.video_path.clone();
    let pipeline = Pipeline::new(config)
        .context("building HTTP client")?
        .with_progress(ProgressLogger::new(verbose));
    let report = pipeline
        .run_blocking()
        .with_context(|| format!("evaluating {}", video_path.display()))?;

    println!("{}", report.output.render());
    Ok(())
}
