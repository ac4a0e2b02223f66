use std::time::Duration;

use crate::error::{FetchError, TransportError};
use crate::fetch::transport::HttpResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Additional attempts after the first.
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            timeout: Duration::from_secs(5),
            max_retries: 2,
            backoff_base: Duration::from_millis(500),
        }
    }
}

/// Classified result of a single attempt.
#[derive(Debug)]
pub enum Outcome {
    Success(String),
    Transient(String),
    Client(u16),
    Unexpected(u16),
}

impl Outcome {
    pub fn classify(result: Result<HttpResponse, TransportError>) -> Self {
        match result {
            Ok(resp) => match resp.status {
                200..=299 => Outcome::Success(resp.body),
                400..=499 => Outcome::Client(resp.status),
                500..=599 => Outcome::Transient(format!("HTTP {}", resp.status)),
                other => Outcome::Unexpected(other),
            },
            Err(e) if e.timed_out => Outcome::Transient(format!("timeout: {}", e)),
            Err(e) => Outcome::Transient(e.to_string()),
        }
    }
}

#[derive(Debug)]
pub enum Step {
    Done(String),
    Retry { next: u32, delay: Duration },
    Fail(FetchError),
}

/// Transition out of `Attempting(attempt)` (zero-based) given its outcome.
pub fn next_step(policy: &RetryPolicy, attempt: u32, outcome: Outcome) -> Step {
    match outcome {
        Outcome::Success(body) => Step::Done(body),
        Outcome::Client(status) => Step::Fail(FetchError::ClientError { status }),
        Outcome::Unexpected(status) => Step::Fail(FetchError::UnexpectedStatus { status }),
        Outcome::Transient(_) if attempt < policy.max_retries => Step::Retry {
            next: attempt + 1,
            delay: backoff_delay(policy.backoff_base, attempt),
        },
        Outcome::Transient(last) => Step::Fail(FetchError::RetriesExhausted {
            attempts: attempt + 1,
            last,
        }),
    }
}

/// Delay slept before retry `attempt + 1`: `base * 2^attempt`, saturating.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}
