use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use huddle_core::DomainError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A domain operation refused the request; carries the typed outcome.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Missing or unknown session token.
    #[error("Not logged in")]
    NotLoggedIn,

    /// Registration is closed on this instance.
    #[error("Registration is closed")]
    RegistrationClosed,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Domain(e) => domain_status(e),
            ApiError::NotLoggedIn => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::RegistrationClosed => (StatusCode::FORBIDDEN, self.to_string()),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Map the domain taxonomy onto HTTP status codes.  Internal failures are
/// logged in full but reported generically.
fn domain_status(e: &DomainError) -> (StatusCode, String) {
    match e {
        DomainError::Unauthorized | DomainError::NotMember => {
            (StatusCode::FORBIDDEN, e.to_string())
        }
        DomainError::BadCredential => (StatusCode::UNAUTHORIZED, e.to_string()),
        DomainError::NotFound
        | DomainError::InvalidIndex
        | DomainError::InvalidCode
        | DomainError::NoPool => (StatusCode::NOT_FOUND, e.to_string()),
        DomainError::InvalidInput(_) | DomainError::InvalidAmount => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        DomainError::DuplicateUsername
        | DomainError::AlreadyMember
        | DomainError::AlreadyRequested
        | DomainError::NotPending
        | DomainError::AdminCannotLeave
        | DomainError::SelfKick => (StatusCode::CONFLICT, e.to_string()),
        DomainError::Store(inner) => {
            tracing::error!(error = %inner, "store failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
        DomainError::Credential(inner) => {
            tracing::error!(error = %inner, "credential hashing failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}
