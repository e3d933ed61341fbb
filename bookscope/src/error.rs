use thiserror::Error;

/// Classified failure taxonomy for the summary pipeline.
///
/// Only `RateLimited` is retryable, and only at the primary invocation tier.
/// Everything else propagates directly to the caller: terminal errors
/// indicate configuration problems, not transient load, and masking them
/// with a fallback would hide the problem from the operator.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// Missing required fields in the inbound request (HTTP 400)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Per-client hourly cap reached, or upstream signalled a transient
    /// rate limit (HTTP 429)
    #[error("rate limited")]
    RateLimited,

    /// Upstream account quota exhausted (HTTP 429, with guidance)
    #[error("generation quota exceeded")]
    QuotaExceeded,

    /// Upstream rejected our credentials (HTTP 401)
    #[error("authentication with the generation service failed")]
    AuthFailed,

    /// Upstream returned content we could not parse (HTTP 500)
    #[error("malformed generation response: {0}")]
    MalformedResponse(String),

    /// Global monthly cap reached; no invocation was attempted (HTTP 503)
    #[error("global monthly generation cap reached")]
    GlobalCapReached,

    /// Anything else: storage, counter store, local I/O
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SummaryError {
    /// Stable classification label used in API error bodies and logs.
    pub fn classification(&self) -> &'static str {
        match self {
            SummaryError::InvalidRequest(_) => "invalid_request",
            SummaryError::RateLimited => "rate_limited",
            SummaryError::QuotaExceeded => "quota_exceeded",
            SummaryError::AuthFailed => "auth_failed",
            SummaryError::MalformedResponse(_) => "malformed_response",
            SummaryError::GlobalCapReached => "global_cap_reached",
            SummaryError::Internal(_) => "internal",
        }
    }

    /// True for the one failure class the invoker may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SummaryError::RateLimited)
    }
}
