//! Error types for the cachenet API client.

use thiserror::Error;

/// Result type alias for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP status ≥ 400; `reasons` are the `error` strings of the body.
    #[error("server rejected request ({status}): {}", .reasons.join("; "))]
    Server { status: u16, reasons: Vec<String> },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Operator-facing reasons, one per line of an error notice.
    pub fn reasons(&self) -> Vec<String> {
        match self {
            Self::Server { reasons, .. } => reasons.clone(),
            other => vec![other.to_string()],
        }
    }
}

/// Errors found by local form validation, before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{0} must be a non-zero port")]
    InvalidPort(&'static str),

    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("application name must start with {0:?}")]
    NamePrefix(String),

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("{0} must be positive")]
    NotPositive(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_lists_reasons() {
        let err = ApiError::Server {
            status: 409,
            reasons: vec!["node 4 busy".to_string(), "retry later".to_string()],
        };
        assert_eq!(err.to_string(), "server rejected request (409): node 4 busy; retry later");
        assert_eq!(err.reasons().len(), 2);
    }

    #[test]
    fn non_server_error_is_single_reason() {
        let err = ApiError::Decode("expected list".to_string());
        assert_eq!(err.reasons(), vec!["invalid response body: expected list".to_string()]);
    }
}
