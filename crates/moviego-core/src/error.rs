use axum::Json;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::envelope::Envelope;

/// Message returned for every 500. Details only go to the log.
pub const INTERNAL_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

/// Render `{"error": message}` with the given status.
pub fn error_response<M: Serialize>(status: StatusCode, message: M) -> Response {
    (status, Json(Envelope::new("error", message))).into_response()
}

/// Failures raised by the shared pipeline before a handler runs.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("the requested resource could not be found")]
    NotFound,
    #[error("the {0} method is not supported for this resource")]
    MethodNotAllowed(Method),
    #[error("{0}")]
    BadRequest(String),
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("{INTERNAL_MESSAGE}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::MethodNotAllowed(_) => "METHOD_NOT_ALLOWED",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::RateLimited => "RATE_LIMITED",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // TraceLayer already records every status; only 500s carry detail worth logging.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = ?e, kind = "INTERNAL", "internal error");
        }
        error_response(self.status(), self.to_string())
    }
}

/// Router fallback for unknown paths.
pub async fn not_found() -> AppError {
    AppError::NotFound
}

/// Router fallback for known paths hit with an unsupported method.
pub async fn method_not_allowed(method: Method) -> AppError {
    AppError::MethodNotAllowed(method)
}
