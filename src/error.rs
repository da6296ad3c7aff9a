use reqwest::StatusCode;
use thiserror::Error;

use crate::validation::ValidationErrors;

/// ApiError
///
/// Every failure the console client can surface. Session failures (`SessionExpired`,
/// `RefreshFailed`, `Forbidden`) have already been handled centrally by the HTTP client
/// by the time a caller sees them: the session is cleared and the user was sent to login.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Session expired")]
    SessionExpired,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Access forbidden")]
    Forbidden,

    /// A 401 on a request that was already retried with a renewed token.
    #[error("Request unauthorized after token renewal")]
    Unauthorized,

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Server error ({status}): {message}")]
    Server { status: StatusCode, message: String },

    #[error("Request failed ({status}): {message}")]
    Http { status: StatusCode, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Could not encode request: {0}")]
    Encode(String),

    #[error("Invalid input: {0}")]
    Validation(ValidationErrors),

    #[error("Account with role {0} may not use the admin console")]
    PermissionDenied(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Upload failed: {0}")]
    Upload(String),
}

impl ApiError {
    /// HTTP status carried by the failure, when the backend answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Server { status, .. } | ApiError::Http { status, .. } => Some(*status),
            ApiError::Forbidden => Some(StatusCode::FORBIDDEN),
            ApiError::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            _ => None,
        }
    }

    /// True when the failure ended the session (forced logout already happened).
    pub fn is_session_failure(&self) -> bool {
        matches!(
            self,
            ApiError::SessionExpired | ApiError::RefreshFailed(_) | ApiError::Forbidden
        )
    }
}
