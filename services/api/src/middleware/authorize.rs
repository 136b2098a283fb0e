//! Route guards layered inside [`authenticate`](super::authenticate::authenticate).
//!
//! Each guard implies the previous one: a permission gate also requires an
//! activated account, which in turn requires an authenticated caller.
//! The permission gate refuses anonymous callers as an authorization failure
//! (403), not as a missing credential.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;

use moviego_domain::user::{Identity, User};

use crate::domain::repository::PermissionRepository;
use crate::error::ApiError;
use crate::state::AppState;

fn identity(req: &Request) -> Result<&Identity, ApiError> {
    req.extensions().get::<Identity>().ok_or_else(|| {
        ApiError::Internal(anyhow::anyhow!(
            "authorization layer mounted outside authenticate"
        ))
    })
}

fn authenticated_user(req: &Request) -> Result<&User, ApiError> {
    identity(req)?.user().ok_or(ApiError::AuthenticationRequired)
}

fn activated_user(req: &Request) -> Result<&User, ApiError> {
    let user = authenticated_user(req)?;
    if !user.activated {
        return Err(ApiError::InactiveAccount);
    }
    Ok(user)
}

pub async fn require_authenticated(req: Request, next: Next) -> Response {
    match authenticated_user(&req) {
        Ok(_) => next.run(req).await,
        Err(e) => e.into_response(),
    }
}

pub async fn require_activated(req: Request, next: Next) -> Response {
    match activated_user(&req) {
        Ok(_) => next.run(req).await,
        Err(e) => e.into_response(),
    }
}

/// Guard for `route_layer(from_fn_with_state(state, require_permission(code)))`.
pub fn require_permission(
    code: &'static str,
) -> impl Fn(State<AppState>, Request, Next) -> BoxFuture<'static, Response> + Clone + Send + Sync + 'static
{
    move |State(state): State<AppState>, req: Request, next: Next| {
        // Only the id crosses the await; the request body is not `Sync`.
        let user_id = permission_candidate(&req);
        Box::pin(async move {
            let checked = match user_id {
                Ok(user_id) => check_permission(&state, user_id, code).await,
                Err(e) => Err(e),
            };
            match checked {
                Ok(()) => next.run(req).await,
                Err(e) => e.into_response(),
            }
        })
    }
}

fn permission_candidate(req: &Request) -> Result<i64, ApiError> {
    if identity(req)?.is_anonymous() {
        return Err(ApiError::AnonymousNotPermitted);
    }
    activated_user(req).map(|user| user.id)
}

async fn check_permission(state: &AppState, user_id: i64, code: &str) -> Result<(), ApiError> {
    let permissions = state.permission_repo().get_all_for_user(user_id).await?;
    if !permissions.includes(code) {
        return Err(ApiError::NotPermitted);
    }
    Ok(())
}
