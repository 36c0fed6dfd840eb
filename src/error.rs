use reqwest::StatusCode;
use thiserror::Error;

/// Why a fetch against the upstream API did not produce data.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP error {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl FetchError {
    /// Connection failures, timeouts, 408, 429 and 5xx are worth another
    /// attempt. Everything else will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(e) => !e.is_decode() && !e.is_builder(),
            FetchError::Status { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::TOO_MANY_REQUESTS
                    || *status == StatusCode::REQUEST_TIMEOUT
            }
            FetchError::Decode(_) | FetchError::InvalidUrl(_) => false,
        }
    }
}

/// Result of one fetch, with benign cancellation kept apart from failures.
#[derive(Debug)]
pub enum FetchOutcome<T> {
    Success(T),
    /// Failed in a way a later attempt may fix.
    TransientFailure(FetchError),
    /// Superseded by a newer request for the same endpoint. Not an error.
    Cancelled,
    PermanentFailure(FetchError),
}

impl<T> FetchOutcome<T> {
    /// Classify an error as transient or permanent.
    pub fn from_error(err: FetchError) -> Self {
        if err.is_retryable() {
            FetchOutcome::TransientFailure(err)
        } else {
            FetchOutcome::PermanentFailure(err)
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchOutcome<U> {
        match self {
            FetchOutcome::Success(v) => FetchOutcome::Success(f(v)),
            FetchOutcome::TransientFailure(e) => FetchOutcome::TransientFailure(e),
            FetchOutcome::Cancelled => FetchOutcome::Cancelled,
            FetchOutcome::PermanentFailure(e) => FetchOutcome::PermanentFailure(e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchOutcome::Cancelled)
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FetchOutcome::TransientFailure(e) | FetchOutcome::PermanentFailure(e) => Some(e),
            _ => None,
        }
    }

    /// `Ok(Some(v))` on success, `Ok(None)` when cancelled, `Err` on failure.
    pub fn into_result(self) -> Result<Option<T>, FetchError> {
        match self {
            FetchOutcome::Success(v) => Ok(Some(v)),
            FetchOutcome::Cancelled => Ok(None),
            FetchOutcome::TransientFailure(e) | FetchOutcome::PermanentFailure(e) => Err(e),
        }
    }

    pub fn success(self) -> Option<T> {
        match self {
            FetchOutcome::Success(v) => Some(v),
            _ => None,
        }
    }
}
