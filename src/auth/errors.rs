//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Failures of the token lifecycle and the request gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Bad credentials at login. Never says which part was wrong.
    AuthenticationFailed,
    /// Signature, format, type or expiry check failed
    InvalidToken,
    /// Well-formed refresh token that is not whitelisted
    RevokedToken,
    /// Missing or malformed protocol payload
    BadRequest(&'static str),
    /// Authenticated but not allowed
    AccessDenied,
    /// No credential on a route that needs one
    NotAuthenticated,
    /// Storage or signing failure, already logged
    Internal,
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::AuthenticationFailed
            | AuthError::InvalidToken
            | AuthError::RevokedToken
            | AuthError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            AuthError::AccessDenied => StatusCode::FORBIDDEN,
            AuthError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Invalid and revoked tokens look the same.
    fn message(&self) -> &'static str {
        match self {
            AuthError::AuthenticationFailed => "Invalid username or password",
            AuthError::InvalidToken | AuthError::RevokedToken => "Invalid or expired token",
            AuthError::BadRequest(msg) => *msg,
            AuthError::AccessDenied => "Forbidden",
            AuthError::NotAuthenticated => "Unauthorized",
            AuthError::Internal => "Internal server error",
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::RevokedToken => write!(f, "Refresh token has been revoked"),
            other => write!(f, "{}", other.message()),
        }
    }
}

impl std::error::Error for AuthError {}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}

/// Log an infrastructure error with context and collapse it to
/// [`AuthError::Internal`].
pub trait AuthResultExt<T> {
    fn internal(self, context: &str) -> Result<T, AuthError>;
}

impl<T, E: std::fmt::Display> AuthResultExt<T> for Result<T, E> {
    fn internal(self, context: &str) -> Result<T, AuthError> {
        self.map_err(|e| {
            tracing::error!(error = %e, "{}", context);
            AuthError::Internal
        })
    }
}
