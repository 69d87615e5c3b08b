use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

/// Errors a handler can return. Every variant renders as `{"message": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),
    /// No user matches the lookup. Answered with 400, not 404, so that
    /// auth endpoints keep a single client-error status.
    #[error("{0}")]
    UnknownUser(String),
    /// Bad credentials, unverified account, or an invalid emailed link.
    #[error("{0}")]
    Auth(String),
    /// Missing or rejected session token.
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::UnknownUser(_) | AppError::Auth(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                let msg = e.to_string();
                if msg.is_empty() {
                    "Something went wrong".to_string()
                } else {
                    msg
                }
            }
            other => {
                warn!(%status, message = %other, "request rejected");
                other.to_string()
            }
        };
        (status, Json(MessageBody { message })).into_response()
    }
}

pub async fn not_found() -> AppError {
    AppError::NotFound("Not found".into())
}
