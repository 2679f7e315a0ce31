//! Error types for the Earth Engine access layer.

use grm_core::geometry::GeometryError;
use thiserror::Error;

/// Main error type for Earth Engine operations.
#[derive(Error, Debug)]
pub enum GeeError {
    /// The client session was never established (missing token, failed probe)
    #[error("imagery service not ready: {0}")]
    NotReady(String),

    /// The service answered with a non-success status
    #[error("upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// A request exceeded the configured deadline
    #[error("request timed out")]
    Timeout,

    /// Transport-level failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered 200 but the payload was not the expected shape
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Invalid region geometry
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

impl GeeError {
    /// Whether a retry can plausibly succeed. Quota throttling and gateway
    /// errors are transient; auth failures and bad requests are not.
    pub fn is_transient(&self) -> bool {
        match self {
            GeeError::Timeout => true,
            GeeError::Upstream { status, .. } => *status == 429 || *status >= 500,
            GeeError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Type alias for Results using GeeError.
pub type Result<T> = std::result::Result<T, GeeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GeeError::Timeout.is_transient());
        assert!(GeeError::Upstream {
            status: 429,
            message: "quota".into()
        }
        .is_transient());
        assert!(GeeError::Upstream {
            status: 503,
            message: "unavailable".into()
        }
        .is_transient());
        assert!(!GeeError::Upstream {
            status: 403,
            message: "forbidden".into()
        }
        .is_transient());
        assert!(!GeeError::NotReady("no token".into()).is_transient());
    }
}
