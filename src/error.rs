use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// ApiError
///
/// The handler-level error taxonomy. Every variant carries a human-readable
/// message and maps to exactly one HTTP status. Handlers never format raw
/// collaborator errors themselves — conversions below funnel everything through
/// the uniform error envelope `{statusCode, success: false, message}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or missing input, validation failures.
    #[error("{0}")]
    BadRequest(String),
    /// Missing/invalid/expired token, bad credentials.
    #[error("{0}")]
    Unauthorized(String),
    /// Role, ownership, or active-status denial.
    #[error("{0}")]
    Forbidden(String),
    /// Missing resource.
    #[error("{0}")]
    NotFound(String),
    /// Duplicate unique field.
    #[error("{0}")]
    Conflict(String),
    /// Collaborator failure. The message stays generic; detail goes to the log.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Maps store failures to the taxonomy: unique-key violations become `Conflict`
/// naming the offending field, row-not-found becomes `NotFound`, anything else is
/// logged and surfaced as a generic internal error.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::not_found("resource not found"),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                let field = constraint_field(db.constraint().unwrap_or_default());
                ApiError::conflict(format!("duplicate value for {field}"))
            }
            _ => {
                tracing::error!("database error: {:?}", err);
                ApiError::internal("internal server error")
            }
        }
    }
}

/// Derives a user-facing field name from a Postgres constraint name, e.g.
/// `users_email_key` → `email`.
fn constraint_field(constraint: &str) -> &str {
    constraint
        .trim_end_matches("_key")
        .trim_end_matches("_idx")
        .rsplit('_')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("unique field")
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {}", self);
        }
        let body = Json(json!({
            "statusCode": status.as_u16(),
            "success": false,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
