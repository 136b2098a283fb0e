pub mod metrics;
pub mod movies;
pub mod tokens;
pub mod users;

use axum::http::{HeaderMap, HeaderName};

use crate::error::ApiError;

/// Optimistic-concurrency precondition, compared against the decimal record version.
pub const X_EXPECTED_VERSION: HeaderName = HeaderName::from_static("x-expected-version");

pub(crate) fn expected_version(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    headers
        .get(X_EXPECTED_VERSION)
        .map(|value| {
            value
                .to_str()
                .map(|s| s.trim().to_owned())
                .map_err(|_| ApiError::BadRequest("invalid X-Expected-Version header".into()))
        })
        .transpose()
}
