use thiserror::Error;

/// Why a damage lookup produced no value.
#[derive(Debug, Error)]
pub enum FetchError {
    /// 4xx: the request itself is wrong, retrying will not help.
    #[error("request failed with client error: HTTP {status}")]
    ClientError { status: u16 },

    #[error("unexpected HTTP status {status}")]
    UnexpectedStatus { status: u16 },

    #[error("retries exhausted after {attempts} attempts (last: {last})")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Page was reachable but carried no total damage value.
    #[error("total damage not found in page")]
    DamageNotFound,

    /// The fetch task panicked or was cancelled before reporting.
    #[error("fetch task aborted: {reason}")]
    Aborted { reason: String },
}

/// Transport-level failure with no usable status code.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub timed_out: bool,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        TransportError {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        TransportError {
            message: message.into(),
            timed_out: true,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::timeout(e.to_string())
        } else {
            TransportError::new(e.to_string())
        }
    }
}
