/// Error types for Scrapp Service
///
/// Every error reaches the client as `{"error": <message>}` with the status
/// code chosen by [`AppError::status_code`].
use crate::services::chat::ChatError;
use crate::services::classifier::ClassifyError;
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

/// Result type for scrapp-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed client input
    #[error("{0}")]
    BadRequest(String),

    /// Field-level validation failures
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    /// Carries the full client-facing message, e.g. `Method "GET" not allowed.`
    #[error("{0}")]
    MethodNotAllowed(String),

    /// Duplicate resource (reported as 400, like any other invalid field)
    #[error("{0}")]
    Conflict(String),

    #[error("Failed to classify: {0}")]
    Classification(#[from] ClassifyError),

    #[error("Gemini call failed: {0}")]
    Upstream(#[from] ChatError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found() -> Self {
        AppError::NotFound("Not found.".to_string())
    }

    pub fn method_not_allowed(method: &str) -> Self {
        AppError::MethodNotAllowed(format!("Method \"{}\" not allowed.", method))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Validation(_) | AppError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Classification(_)
            | AppError::Upstream(_)
            | AppError::Database(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_msg = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %error_msg, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %error_msg, "Request rejected");
        }

        HttpResponse::build(status).json(serde_json::json!({ "error": error_msg }))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let detail = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}: {}", field, detail)
            })
            .collect();
        messages.sort();
        AppError::Validation(messages.join("; "))
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        AppError::Internal(err.to_string())
    }
}
