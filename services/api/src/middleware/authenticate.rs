//! Bearer token authentication and the per-request identity accessors.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{AUTHORIZATION, VARY};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use moviego_domain::token::{Scope, TOKEN_PLAINTEXT_LEN};
use moviego_domain::user::{Identity, User};

use crate::domain::repository::UserRepository;
use crate::error::ApiError;
use crate::state::AppState;

/// Attach an [`Identity`] to the request.
///
/// No `Authorization` header means [`Identity::Anonymous`]. A header that is
/// not `Bearer <token>`, or a token that does not resolve to a user, is rejected.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let mut response = match resolve(&state, req.headers()).await {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    };
    response
        .headers_mut()
        .append(VARY, HeaderValue::from_static("Authorization"));
    response
}

async fn resolve(state: &AppState, headers: &HeaderMap) -> Result<Identity, ApiError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(Identity::Anonymous);
    };
    let token = bearer_token(value).ok_or(ApiError::InvalidAuthenticationToken)?;
    if token.len() != TOKEN_PLAINTEXT_LEN {
        return Err(ApiError::InvalidAuthenticationToken);
    }
    match state
        .user_repo()
        .get_for_token(Scope::Authentication, token)
        .await
    {
        Ok(user) => Ok(Identity::User(user)),
        Err(ApiError::NotFound) => Err(ApiError::InvalidAuthenticationToken),
        Err(e) => Err(e),
    }
}

fn bearer_token(value: &HeaderValue) -> Option<&str> {
    let mut parts = value.to_str().ok()?.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}

// ── Extractors ────────────────────────────────────────────────────────────────

/// The authenticated caller. Anonymous requests are rejected; a request that
/// never passed through [`authenticate`] is a server fault.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let identity = parts.extensions.get::<Identity>().cloned();
        async move {
            match identity {
                Some(Identity::User(user)) => Ok(Self(user)),
                Some(Identity::Anonymous) => Err(ApiError::AuthenticationRequired),
                None => Err(ApiError::Internal(anyhow::anyhow!(
                    "identity missing from request"
                ))),
            }
        }
    }
}
