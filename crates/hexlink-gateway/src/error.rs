use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hexlink_core::ShortenerError;
use tracing::error;

use crate::model::ErrorResponse;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("no mapping for short key '{0}'")]
    NotFound(String),
    #[error("stored url for short key '{0}' is not a valid redirect target")]
    InvalidRedirect(String),
    #[error(transparent)]
    Shortener(#[from] ShortenerError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRedirect(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Shortener(ShortenerError::KeySpaceExhausted { .. })
            | AppError::Shortener(ShortenerError::StoreUnavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Shortener(ShortenerError::DigestUnavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
