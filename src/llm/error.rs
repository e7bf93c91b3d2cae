//! Failure classification for provider calls

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;

/// Why a provider call did not produce an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RateLimited,
    AuthFailed,
    /// Any other non-2xx status
    UpstreamError(u16),
    /// Sent, but nothing came back
    NoResponse,
    Timeout,
    /// Failed before anything was sent
    RequestSetupFailed,
}

impl ErrorKind {
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimited,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::AuthFailed,
            other => ErrorKind::UpstreamError(other.as_u16()),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::RateLimited => f.write_str("rate limit exceeded"),
            ErrorKind::AuthFailed => f.write_str("authentication failed"),
            ErrorKind::UpstreamError(status) => write!(f, "API error: {}", status),
            ErrorKind::NoResponse => f.write_str("no response received"),
            ErrorKind::Timeout => f.write_str("timeout"),
            ErrorKind::RequestSetupFailed => f.write_str("request failed"),
        }
    }
}

/// A classified provider failure.
///
/// `Display` gives the caller-safe message (`"<Provider> <classification>"`);
/// `details` keeps the underlying error text for logs and development mode.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{provider} {kind}")]
pub struct ProviderError {
    pub provider: String,
    pub kind: ErrorKind,
    pub details: String,
}

impl ProviderError {
    pub fn new(provider: impl Into<String>, kind: ErrorKind, details: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            kind,
            details: details.into(),
        }
    }

    /// Non-2xx response from the upstream
    pub fn from_status(provider: &str, status: StatusCode, body: &str) -> Self {
        let details = if body.is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, body)
        };
        Self::new(provider, ErrorKind::from_status(status), details)
    }

    /// Transport-level failure reported by reqwest
    pub fn from_reqwest(provider: &str, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_builder() {
            ErrorKind::RequestSetupFailed
        } else if let Some(status) = err.status() {
            ErrorKind::from_status(status)
        } else {
            ErrorKind::NoResponse
        };
        Self::new(provider, kind, err.to_string())
    }

    pub fn timeout(provider: &str, after: Duration) -> Self {
        Self::new(
            provider,
            ErrorKind::Timeout,
            format!("no outcome within {}ms", after.as_millis()),
        )
    }
}
