use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// AppError
///
/// The single error type returned by handlers, extractors and the submission gate.
/// Validation failures carry a user-facing message; store and filesystem failures are
/// logged and collapsed into a generic 500 so internals never leak to the client.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No token")]
    Unauthenticated,

    #[error("Invalid token")]
    InvalidCredential,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid format. Only PDF files are accepted.")]
    InvalidFormat,

    #[error("File too large. Max {max_mb}MB.")]
    TooLarge { max_mb: i64 },

    #[error("An application already exists for this tax code or email.")]
    Duplicate,

    #[error("Maximum number of applications reached.")]
    QuotaExceeded,

    #[error("{0}")]
    NotFound(String),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl AppError {
    /// HTTP status associated with the error kind.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::InvalidCredential => StatusCode::FORBIDDEN,
            AppError::InvalidInput(_)
            | AppError::InvalidFormat
            | AppError::TooLarge { .. }
            | AppError::Duplicate
            | AppError::QuotaExceeded => StatusCode::BAD_REQUEST,
            AppError::Multipart(e) => e.status(),
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Internal server error".to_string()
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {:?}", e);
                "Internal server error".to_string()
            }
            AppError::Multipart(e) => e.body_text(),
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
