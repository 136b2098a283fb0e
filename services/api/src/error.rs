use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use moviego_core::error::{AppError, INTERNAL_MESSAGE, error_response};
use moviego_domain::validator::ValidationErrors;

/// Failures surfaced by the movie API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("failed validation: {0}")]
    FailedValidation(ValidationErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("the requested resource could not be found")]
    NotFound,
    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,
    #[error("a user with this email address already exists")]
    DuplicateEmail,
    #[error("invalid authentication credentials")]
    InvalidCredentials,
    #[error("invalid or missing authentication token")]
    InvalidAuthenticationToken,
    #[error("you must be authenticated to access this resource")]
    AuthenticationRequired,
    #[error("anonymous access to this resource is not permitted")]
    AnonymousNotPermitted,
    #[error("your user account must be activated to access this resource")]
    InactiveAccount,
    #[error("your user account doesn't have the necessary permissions to access this resource")]
    NotPermitted,
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("the server is temporarily unable to handle the request, please try again later")]
    StoreUnavailable(#[source] anyhow::Error),
    #[error("{INTERNAL_MESSAGE}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FailedValidation(_) => "FAILED_VALIDATION",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::NotFound => "NOT_FOUND",
            Self::EditConflict => "EDIT_CONFLICT",
            Self::DuplicateEmail => "DUPLICATE_EMAIL",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidAuthenticationToken => "INVALID_AUTHENTICATION_TOKEN",
            Self::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            Self::AnonymousNotPermitted => "ANONYMOUS_NOT_PERMITTED",
            Self::InactiveAccount => "INACTIVE_ACCOUNT",
            Self::NotPermitted => "NOT_PERMITTED",
            Self::RateLimited => "RATE_LIMITED",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::FailedValidation(_) | Self::DuplicateEmail => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::EditConflict => StatusCode::CONFLICT,
            Self::InvalidCredentials
            | Self::InvalidAuthenticationToken
            | Self::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            Self::AnonymousNotPermitted | Self::InactiveAccount | Self::NotPermitted => {
                StatusCode::FORBIDDEN
            }
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Single-field validation failure, e.g. `("token", "must be provided")`.
    pub fn field(key: &str, message: &str) -> Self {
        Self::FailedValidation(ValidationErrors::single(key, message))
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::FailedValidation(errors)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound => Self::NotFound,
            AppError::BadRequest(message) => Self::BadRequest(message),
            AppError::RateLimited => Self::RateLimited,
            AppError::MethodNotAllowed(method) => {
                Self::BadRequest(format!("the {method} method is not supported for this resource"))
            }
            AppError::Internal(e) => Self::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            // TraceLayer records every status; only server-side faults carry detail worth logging.
            Self::Internal(e) => tracing::error!(error = ?e, kind = self.kind(), "internal error"),
            Self::StoreUnavailable(e) => {
                tracing::warn!(error = ?e, kind = self.kind(), "store unavailable")
            }
            _ => {}
        }
        match self {
            Self::FailedValidation(errors) => error_response(status, errors),
            Self::DuplicateEmail => error_response(
                status,
                ValidationErrors::single("email", "a user with this email address already exists"),
            ),
            Self::InvalidAuthenticationToken => {
                let mut resp = error_response(status, self.to_string());
                resp.headers_mut()
                    .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                resp
            }
            other => error_response(status, other.to_string()),
        }
    }
}
