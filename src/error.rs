//! Error taxonomy for the proxy boundary.
//!
//! Every failure that leaves the pipeline is a [`ProxyError`], which carries a
//! machine-readable [`ErrorCode`] and an HTTP-style status. Subsystem errors
//! (`FetchError`, `ConfigError`, ...) convert into it at the boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::RejectReason;
use crate::upstream::FetchError;

/// Machine-readable error code returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInput,
    PolicyRejected,
    UpstreamTimeout,
    UpstreamNetworkError,
    ContentTooLarge,
    ServiceDisabled,
    Unclassified,
}

impl ErrorCode {
    /// HTTP status reported for this code.
    pub fn status(self) -> u16 {
        match self {
            ErrorCode::InvalidInput => 400,
            ErrorCode::PolicyRejected => 403,
            ErrorCode::ContentTooLarge => 413,
            ErrorCode::ServiceDisabled => 503,
            ErrorCode::UpstreamNetworkError => 502,
            ErrorCode::UpstreamTimeout => 504,
            ErrorCode::Unclassified => 500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::PolicyRejected => "POLICY_REJECTED",
            ErrorCode::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            ErrorCode::UpstreamNetworkError => "UPSTREAM_NETWORK_ERROR",
            ErrorCode::ContentTooLarge => "CONTENT_TOO_LARGE",
            ErrorCode::ServiceDisabled => "SERVICE_DISABLED",
            ErrorCode::Unclassified => "UNCLASSIFIED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced past the pipeline boundary.
#[derive(Debug, Clone, Error)]
pub enum ProxyError {
    /// Missing or malformed URL, or a malformed request body.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Target rejected by the domain allow/block lists.
    #[error("request rejected: {0}")]
    PolicyRejected(RejectReason),

    #[error("upstream timed out after {0} seconds")]
    UpstreamTimeout(u64),

    #[error("upstream network error: {0}")]
    UpstreamNetwork(String),

    #[error("content exceeds limit of {limit} bytes")]
    ContentTooLarge { limit: usize },

    #[error("proxy service is disabled")]
    ServiceDisabled,

    #[error("unclassified failure: {0}")]
    Unclassified(String),
}

impl ProxyError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ProxyError::InvalidInput(_) => ErrorCode::InvalidInput,
            ProxyError::PolicyRejected(RejectReason::InvalidUrl) => ErrorCode::InvalidInput,
            ProxyError::PolicyRejected(_) => ErrorCode::PolicyRejected,
            ProxyError::UpstreamTimeout(_) => ErrorCode::UpstreamTimeout,
            ProxyError::UpstreamNetwork(_) => ErrorCode::UpstreamNetworkError,
            ProxyError::ContentTooLarge { .. } => ErrorCode::ContentTooLarge,
            ProxyError::ServiceDisabled => ErrorCode::ServiceDisabled,
            ProxyError::Unclassified(_) => ErrorCode::Unclassified,
        }
    }

    pub fn status(&self) -> u16 {
        self.code().status()
    }

    /// Structured error body handed to callers.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            error: self.to_string(),
            status: self.status(),
        }
    }
}

impl From<RejectReason> for ProxyError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::InvalidUrl => ProxyError::InvalidInput(reason.to_string()),
            other => ProxyError::PolicyRejected(other),
        }
    }
}

impl From<FetchError> for ProxyError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout(secs) => ProxyError::UpstreamTimeout(secs),
            FetchError::Network(msg) => ProxyError::UpstreamNetwork(msg),
            FetchError::TooLarge { limit } => ProxyError::ContentTooLarge { limit },
            FetchError::InvalidRequest(msg) => ProxyError::InvalidInput(msg),
        }
    }
}

/// Wire shape of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub error: String,
    pub status: u16,
}

pub type ProxyResult<T> = Result<T, ProxyError>;
