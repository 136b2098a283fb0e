use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_REQUEST_METHOD, ORIGIN, VARY,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

const PREFLIGHT_METHODS: &str = "OPTIONS, PUT, PATCH, DELETE";
const PREFLIGHT_HEADERS: &str = "Authorization, Content-Type";

/// Origins allowed to read responses cross-origin. Matching is exact.
#[derive(Debug, Clone, Default)]
pub struct TrustedOrigins(Arc<Vec<String>>);

impl TrustedOrigins {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(Arc::new(origins.into_iter().map(Into::into).collect()))
    }

    pub fn contains(&self, origin: &str) -> bool {
        self.0.iter().any(|o| o == origin)
    }
}

/// Echo a trusted `Origin` back and answer its preflight requests directly.
pub async fn cors(State(origins): State<TrustedOrigins>, req: Request, next: Next) -> Response {
    let trusted = req
        .headers()
        .get(ORIGIN)
        .filter(|v| v.to_str().is_ok_and(|o| !o.is_empty() && origins.contains(o)))
        .cloned();
    let preflight =
        req.method() == Method::OPTIONS && req.headers().contains_key(ACCESS_CONTROL_REQUEST_METHOD);

    let mut response = match (&trusted, preflight) {
        (Some(_), true) => {
            let mut resp = StatusCode::OK.into_response();
            let headers = resp.headers_mut();
            headers.insert(
                ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(PREFLIGHT_METHODS),
            );
            headers.insert(
                ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(PREFLIGHT_HEADERS),
            );
            resp
        }
        _ => next.run(req).await,
    };

    let headers = response.headers_mut();
    headers.append(VARY, HeaderValue::from_static("Origin"));
    headers.append(VARY, HeaderValue::from_static("Access-Control-Request-Method"));
    if let Some(origin) = trusted {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    response
}
