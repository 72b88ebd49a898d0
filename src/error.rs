use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("authentication required")]
    Unauthorized,

    #[error("permission denied")]
    Forbidden,

    /// Request was well-formed but conflicts with current state, e.g. an
    /// oversell attempt or an exhausted invoice number sequence.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("internal server error")]
    Internal(String),
}

/// True when a statement bounced off a UNIQUE constraint, e.g. a duplicate
/// SKU or email.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(database_error_kind(err), Some(sqlx::error::ErrorKind::UniqueViolation))
}

/// True when a statement bounced off a FOREIGN KEY constraint, e.g. deleting
/// an item that invoice lines still reference.
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(
        database_error_kind(err),
        Some(sqlx::error::ErrorKind::ForeignKeyViolation)
    )
}

fn database_error_kind(err: &sqlx::Error) -> Option<sqlx::error::ErrorKind> {
    match err {
        sqlx::Error::Database(db) => Some(db.kind()),
        _ => None,
    }
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            // Never leak driver errors to clients
            AppError::Database(e) => {
                log::error!("database error: {e}");
                "internal server error".to_string()
            }
            AppError::Internal(detail) => {
                log::error!("internal error: {detail}");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        let (status, code) = AppError::validation("quantity must be positive").status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "validation_error");
    }

    #[test]
    fn conflict_maps_to_409() {
        let (status, code) = AppError::conflict("not enough stock").status_and_code();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "conflict");
    }

    #[test]
    fn database_errors_are_masked() {
        let err = AppError::Database(sqlx::Error::RowNotFound);
        let (status, _) = err.status_and_code();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn constraint_checks_ignore_non_database_errors() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_foreign_key_violation(&sqlx::Error::PoolClosed));
    }
}
