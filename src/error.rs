//! Error taxonomy and its mapping to HTTP responses.
//!
//! Domain errors are raised where they are detected and propagated unchanged
//! with `?`; only [`AppError`]'s `IntoResponse` impl decides status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt;

use crate::db::DbLockError;

/// Kind of record a lookup failed to find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Course,
    Module,
    Lesson,
    Enrollment,
    User,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Course => "Course",
            Resource::Module => "Module",
            Resource::Lesson => "Lesson",
            Resource::Enrollment => "Enrollment",
            Resource::User => "User",
        };
        f.write_str(name)
    }
}

/// Outcome of a denied entitlement check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("{0} not found")]
    NotFound(Resource),

    #[error("Authentication required")]
    AuthenticationRequired,

    /// Authenticated, but neither enrolled, owner nor admin
    #[error("You do not have access to this course")]
    NotEnrolled,

    /// Authorized, but the lesson has nothing to play
    #[error("This lesson has no playable content")]
    NoContent,
}

/// Failures while minting a playback ticket.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TicketError {
    /// The stored locator cannot be turned into a signable media key.
    /// Indicates corrupt lesson data.
    #[error("media locator {locator:?} is not addressable: {reason}")]
    ContentAddressing { locator: String, reason: &'static str },

    #[error("ticket lifetime must be positive")]
    InvalidLifetime,
}

/// Failures while checking a signed media URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Signed link is missing parameters")]
    Missing,

    #[error("Signed link is invalid")]
    Invalid,

    #[error("Signed link has expired")]
    Expired,
}

/// Application-level error type for HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Ticket(#[from] TicketError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    DbUnavailable(#[from] DbLockError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

const GENERIC_INTERNAL: &str = "An internal error occurred";

impl AppError {
    /// HTTP status, machine-readable code and client-facing message
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Access(access) => match access {
                AccessError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", access.to_string())
                }
                AccessError::AuthenticationRequired => (
                    StatusCode::UNAUTHORIZED,
                    "AUTHENTICATION_REQUIRED",
                    access.to_string(),
                ),
                AccessError::NotEnrolled => {
                    (StatusCode::FORBIDDEN, "NOT_ENROLLED", access.to_string())
                }
                AccessError::NoContent => {
                    (StatusCode::BAD_REQUEST, "NO_CONTENT", access.to_string())
                }
            },
            AppError::Ticket(TicketError::ContentAddressing { .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                GENERIC_INTERNAL.to_string(),
            ),
            AppError::Ticket(e @ TicketError::InvalidLifetime) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", e.to_string())
            }
            AppError::Signature(e) => (StatusCode::FORBIDDEN, "INVALID_SIGNATURE", e.to_string()),
            AppError::Database(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                GENERIC_INTERNAL.to_string(),
            ),
            AppError::DbUnavailable(e) => {
                (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", e.to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS", self.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        match &self {
            AppError::Ticket(TicketError::ContentAddressing { .. }) => {
                // Already logged with course/lesson context by the issuer
            }
            AppError::Database(e) => tracing::error!(error = %e, "Database error"),
            AppError::Internal(msg) => tracing::error!(error = %msg, "Internal error"),
            AppError::DbUnavailable(e) => tracing::error!(error = %e, "Database unavailable"),
            _ => tracing::debug!(code, %message, "Request rejected"),
        }

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
