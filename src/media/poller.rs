//! Polls a handle until the remote finishes processing it.
//!
//! Delays start at `initial_delay` and double after every non-terminal
//! snapshot, capped at `max_delay`. The elapsed total only counts time
//! actually slept, and it is compared to the budget after each sleep. The
//! last sleep can therefore overshoot `max_wait` by up to one capped delay.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ActiveMedia, MediaHandle, ProcessingState};
use crate::pipeline::PipelineStage;
use crate::transport::MediaTransport;
use crate::utilities::errors::{EvalError, EvalResult};

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Total wait budget and backoff bounds for one polling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Stop with a timeout once this much time has been slept.
    pub max_wait: Duration,
    /// First delay between lookups.
    pub initial_delay: Duration,
    /// Upper bound for the doubled delay.
    pub max_delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(180),
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl PollPolicy {
    /// Reject zero delays and an inverted delay range.
    pub fn validate(&self) -> EvalResult<()> {
        if self.initial_delay.is_zero() {
            return Err(EvalError::configuration("initial poll delay must be positive"));
        }
        if self.max_delay < self.initial_delay {
            return Err(EvalError::configuration(
                "max poll delay must not be smaller than the initial delay",
            ));
        }
        if self.max_wait.is_zero() {
            return Err(EvalError::configuration("poll wait budget must be positive"));
        }
        Ok(())
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.initial_delay, self.max_delay)
    }
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Doubling delay sequence with a cap: 2, 4, 8, 10, 10, ... for the defaults.
///
/// The iterator never ends.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            current: initial.min(max),
            max,
        }
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        Some(delay)
    }
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// What the poller saw on one non-terminal lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollAttempt {
    /// 1-based lookup count.
    pub attempt: u32,
    /// State reported by the lookup.
    pub state: ProcessingState,
    /// Delay about to be slept.
    pub next_delay: Duration,
    /// Time slept so far, before this delay.
    pub waited: Duration,
}

type PollObserver = Arc<dyn Fn(&PollAttempt) + Send + Sync>;

/// Re-fetches a handle until it becomes ACTIVE or FAILED, or the budget runs out.
#[derive(Clone)]
pub struct StatePoller {
    transport: Arc<dyn MediaTransport>,
    policy: PollPolicy,
    observer: Option<PollObserver>,
}

impl StatePoller {
    pub fn new(transport: Arc<dyn MediaTransport>, policy: PollPolicy) -> Self {
        Self {
            transport,
            policy,
            observer: None,
        }
    }

    /// Call `observer` before every backoff sleep.
    pub fn with_observer(
        mut self,
        observer: impl Fn(&PollAttempt) + Send + Sync + 'static,
    ) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Poll `name` until it is ACTIVE and return its URI.
    pub async fn wait_until_active(&self, name: &str) -> EvalResult<ActiveMedia> {
        let mut backoff = self.policy.backoff();
        let mut waited = Duration::ZERO;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let (snapshot, body) = self.lookup(name).await?;

            match snapshot.state_or_unknown() {
                ProcessingState::Active => {
                    let uri = snapshot.non_empty_uri().ok_or_else(|| {
                        EvalError::malformed(
                            PipelineStage::Polling,
                            format!("{} is ACTIVE but has no uri", name),
                            body,
                        )
                    })?;
                    log::info!("{} is ACTIVE after {:?}", name, waited);
                    return Ok(ActiveMedia::new(
                        snapshot.name.clone().unwrap_or_else(|| name.to_string()),
                        uri.to_string(),
                        snapshot.mime_type.clone(),
                    ));
                }
                ProcessingState::Failed => {
                    return Err(EvalError::ProcessingFailed {
                        name: name.to_string(),
                    });
                }
                state => {
                    // Infinite iterator; the fallback is never taken.
                    let delay = backoff.next().unwrap_or(self.policy.max_delay);
                    log::info!(
                        "{} state: {}, rechecking in {:?} (waited {:?} of {:?})",
                        name,
                        state,
                        delay,
                        waited,
                        self.policy.max_wait
                    );
                    if let Some(observer) = &self.observer {
                        observer(&PollAttempt {
                            attempt,
                            state,
                            next_delay: delay,
                            waited,
                        });
                    }

                    tokio::time::sleep(delay).await;
                    waited += delay;

                    if waited >= self.policy.max_wait {
                        return Err(EvalError::Timeout {
                            waited,
                            budget: self.policy.max_wait,
                        });
                    }
                }
            }
        }
    }

    /// One lookup, mapped onto a normalized snapshot plus the raw body.
    async fn lookup(&self, name: &str) -> EvalResult<(MediaHandle, String)> {
        let response = self.transport.get_file(name).await?;

        let json = match response.json() {
            Ok(json) => json,
            Err(_) if !response.is_success() => {
                return Err(EvalError::Lookup {
                    status: response.status,
                    body: response.body,
                });
            }
            Err(e) => {
                return Err(EvalError::malformed(
                    PipelineStage::Polling,
                    format!("lookup response is not JSON: {}", e),
                    response.body,
                ));
            }
        };

        if json.get("error").is_some() || !response.is_success() {
            return Err(EvalError::Lookup {
                status: response.status,
                body: response.body,
            });
        }

        match MediaHandle::from_wire(&json) {
            Some(handle) => Ok((handle, response.body)),
            None => Err(EvalError::malformed(
                PipelineStage::Polling,
                "lookup response is not a JSON object",
                response.body,
            )),
        }
    }
}
