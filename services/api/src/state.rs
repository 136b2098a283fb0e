use std::sync::Arc;

use axum::extract::FromRef;

use moviego_core::background::BackgroundTasks;
use moviego_core::cors::TrustedOrigins;
use moviego_core::health::SystemInfo;
use moviego_core::metrics::Metrics;
use moviego_core::rate_limit::RateLimiter;

use crate::infra::mail::Mailer;
use crate::infra::store::{Backend, MovieStore, PermissionStore, TokenStore, UserStore};

/// Shared application state passed to every handler and middleware via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub backend: Backend,
    pub mailer: Mailer,
    pub background: BackgroundTasks,
    pub limiter: Arc<RateLimiter>,
    pub metrics: Arc<Metrics>,
    pub origins: TrustedOrigins,
    pub system_info: SystemInfo,
}

impl AppState {
    pub fn movie_repo(&self) -> MovieStore {
        self.backend.movies()
    }

    pub fn user_repo(&self) -> UserStore {
        self.backend.users()
    }

    pub fn token_repo(&self) -> TokenStore {
        self.backend.tokens()
    }

    pub fn permission_repo(&self) -> PermissionStore {
        self.backend.permissions()
    }
}

impl FromRef<AppState> for Arc<RateLimiter> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.limiter)
    }
}

impl FromRef<AppState> for Arc<Metrics> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.metrics)
    }
}

impl FromRef<AppState> for TrustedOrigins {
    fn from_ref(state: &AppState) -> Self {
        state.origins.clone()
    }
}

impl FromRef<AppState> for SystemInfo {
    fn from_ref(state: &AppState) -> Self {
        state.system_info.clone()
    }
}
