use axum::body::{Body, to_bytes};
use bytes::Bytes;
use http::Response;
use serde_json::Value;

/// Collect the whole response body. Panics if the body errors.
pub async fn body_bytes(response: Response<Body>) -> Bytes {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable response body")
}

/// Collect and parse the response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("invalid JSON body {:?}: {e}", String::from_utf8_lossy(&bytes)))
}
