//! Strict JSON request bodies.

use std::future::Future;

use axum::body::to_bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::error::AppError;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1_048_576;

/// JSON body extractor with client-readable rejections.
///
/// Unlike `axum::Json` it does not look at `Content-Type`, and every failure is a
/// 400 with a message naming what was wrong. Unknown keys are rejected when the
/// target type uses `#[serde(deny_unknown_fields)]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request(
        req: Request,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let bytes = to_bytes(req.into_body(), MAX_BODY_BYTES).await.map_err(|_| {
                AppError::BadRequest(format!(
                    "body must not be larger than {MAX_BODY_BYTES} bytes"
                ))
            })?;
            decode(&bytes).map(JsonBody)
        }
    }
}

/// Decode a complete body into `T`, describing any problem in client terms.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest("body must not be empty".into()));
    }
    serde_json::from_slice(bytes).map_err(|e| AppError::BadRequest(describe(&e)))
}

fn describe(e: &serde_json::Error) -> String {
    let message = e.to_string();
    match e.classify() {
        Category::Eof => "body contains badly-formed JSON".to_owned(),
        Category::Syntax if message.starts_with("trailing characters") => {
            "body must only contain a single JSON value".to_owned()
        }
        Category::Syntax => format!(
            "body contains badly-formed JSON (at line {} column {})",
            e.line(),
            e.column()
        ),
        Category::Data => {
            if let Some(rest) = message.strip_prefix("unknown field `") {
                let key = rest.split('`').next().unwrap_or_default();
                format!("body contains unknown key \"{key}\"")
            } else if message.starts_with("invalid type") || message.starts_with("invalid value") {
                format!(
                    "body contains incorrect JSON type (at line {} column {})",
                    e.line(),
                    e.column()
                )
            } else {
                format!("body contains invalid JSON: {message}")
            }
        }
        Category::Io => "body could not be read".to_owned(),
    }
}
