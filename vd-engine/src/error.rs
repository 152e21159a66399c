//! Error types for vd-engine
//!
//! Two layers:
//! - [`BackendError`]: raised by a VLM backend for a single pass
//! - [`DescribeError`]: fatal outcome of `describe_image` for one image
//!
//! Parse failures are not errors; they are recorded in pass reports.

use crate::types::PassId;
use thiserror::Error;

/// Failure raised by a backend adapter
///
/// Malformed model output is never reported here; it is passed through to the
/// parser verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// No credential or network path configured, or credential rejected
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Provider asked the caller to back off
    #[error("Backend rate limited: {0}")]
    RateLimited(String),

    /// Any other transport or provider failure
    #[error("Backend transport error: {0}")]
    Transport(String),
}

/// Fatal result of describing one image
///
/// No partial record accompanies any of these.
#[derive(Debug, Error)]
pub enum DescribeError {
    /// Input bytes are empty or not a recognized image format
    #[error("Invalid image '{image_id}': {reason}")]
    InvalidImage { image_id: String, reason: String },

    /// Requested pass identifier outside {A, B, C}
    #[error("Invalid pass identifier: '{0}' (expected A, B or C)")]
    InvalidPass(String),

    /// Backend has no credential/network path
    #[error("Backend unavailable during pass {pass}: {reason}")]
    BackendUnavailable { pass: PassId, reason: String },

    /// Backend asked to back off; retry policy belongs to the caller
    #[error("Backend rate limited during pass {pass}: {reason}")]
    RateLimited { pass: PassId, reason: String },

    /// Other backend failure
    #[error("Backend error during pass {pass}: {reason}")]
    Backend { pass: PassId, reason: String },
}

impl DescribeError {
    /// Attach the failing pass to a backend error
    pub fn from_backend(pass: PassId, err: BackendError) -> Self {
        match err {
            BackendError::Unavailable(reason) => DescribeError::BackendUnavailable { pass, reason },
            BackendError::RateLimited(reason) => DescribeError::RateLimited { pass, reason },
            BackendError::Transport(reason) => DescribeError::Backend { pass, reason },
        }
    }

    /// Stable cause tag for callers rendering the failure
    pub fn code(&self) -> &'static str {
        match self {
            DescribeError::InvalidImage { .. } => "INVALID_IMAGE",
            DescribeError::InvalidPass(_) => "INVALID_PASS",
            DescribeError::BackendUnavailable { .. } => "BACKEND_UNAVAILABLE",
            DescribeError::RateLimited { .. } => "RATE_LIMITED",
            DescribeError::Backend { .. } => "BACKEND_ERROR",
        }
    }

    /// True for failures caused by the caller's input rather than the backend
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            DescribeError::InvalidImage { .. } | DescribeError::InvalidPass(_)
        )
    }
}

/// Result type for engine operations
pub type DescribeResult<T> = Result<T, DescribeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_mapping() {
        let err = DescribeError::from_backend(
            PassId::A,
            BackendError::Unavailable("no key".to_string()),
        );
        assert_eq!(err.code(), "BACKEND_UNAVAILABLE");
        assert!(err.to_string().contains("pass A"));
        assert!(!err.is_input_error());

        let err = DescribeError::from_backend(PassId::C, BackendError::RateLimited("429".into()));
        assert_eq!(err.code(), "RATE_LIMITED");

        let err = DescribeError::from_backend(PassId::B, BackendError::Transport("reset".into()));
        assert_eq!(err.code(), "BACKEND_ERROR");
    }

    #[test]
    fn test_input_errors() {
        assert!(DescribeError::InvalidPass("D".into()).is_input_error());
        let err = DescribeError::InvalidImage {
            image_id: "x".into(),
            reason: "empty".into(),
        };
        assert_eq!(err.code(), "INVALID_IMAGE");
        assert!(err.is_input_error());
    }
}
