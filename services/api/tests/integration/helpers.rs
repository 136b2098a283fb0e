use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use tower::ServiceExt;

use moviego_api::domain::credential::hash_password_blocking;
use moviego_api::domain::repository::{PermissionRepository, UserRepository};
use moviego_api::infra::mail::{Mailer, MemoryMailer};
use moviego_api::infra::memory::MemoryStore;
use moviego_api::infra::store::Backend;
use moviego_api::router::build_router;
use moviego_api::state::AppState;
use moviego_api::usecase::token::{authentication_ttl, issue_token};
use moviego_core::background::BackgroundTasks;
use moviego_core::cors::TrustedOrigins;
use moviego_core::health::SystemInfo;
use moviego_core::metrics::Metrics;
use moviego_core::rate_limit::{RateLimitConfig, RateLimiter};
use moviego_domain::movie::NewMovie;
use moviego_domain::token::Scope;
use moviego_domain::user::{NewUser, User};

pub const TEST_PASSWORD: &str = "pa55word-for-tests";
pub const TRUSTED_ORIGIN: &str = "https://trusted.example";

// ── App harness ───────────────────────────────────────────────────────────────

pub struct TestApp {
    pub state: AppState,
    pub store: MemoryStore,
    pub mailer: MemoryMailer,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_limiter(RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        })
    }

    pub fn with_limiter(limits: RateLimitConfig) -> Self {
        let store = MemoryStore::new();
        let mailer = MemoryMailer::new();
        let state = AppState {
            backend: Backend::Memory(store.clone()),
            mailer: Mailer::Memory(mailer.clone()),
            background: BackgroundTasks::new(),
            limiter: Arc::new(RateLimiter::new(limits)),
            metrics: Arc::new(Metrics::new()),
            origins: TrustedOrigins::new([TRUSTED_ORIGIN]),
            system_info: SystemInfo {
                environment: "testing".into(),
                version: "0.0.0".into(),
            },
        };
        Self {
            router: build_router(state.clone()),
            state,
            store,
            mailer,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    /// Poll until the welcome mail for `email` has been delivered by the background task.
    pub async fn activation_token_for(&self, email: &str) -> String {
        for _ in 0..200 {
            if let Some(token) = self.mailer.activation_token_for(email) {
                return token;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no welcome mail delivered to {email}");
    }
}

// ── Fixtures ──────────────────────────────────────────────────────────────────

pub fn new_movie(title: &str, year: i32, genres: &[&str]) -> NewMovie {
    NewMovie {
        title: title.to_owned(),
        year,
        runtime: 110,
        genres: genres.iter().map(|g| (*g).to_owned()).collect(),
    }
}

pub fn new_user(email: &str, activated: bool) -> NewUser {
    NewUser {
        name: "Alice Smith".into(),
        email: email.to_owned(),
        password_hash: hash_password_blocking(TEST_PASSWORD).unwrap(),
        activated,
    }
}

/// Insert a user holding `permissions` and return it with a live authentication token.
pub async fn seed_user(
    store: &MemoryStore,
    email: &str,
    activated: bool,
    permissions: &[&str],
) -> (User, String) {
    let user = store
        .user_repo()
        .insert(&new_user(email, activated))
        .await
        .unwrap();
    store
        .permission_repo()
        .add_for_user(user.id, permissions)
        .await
        .unwrap();
    let token = issue_token(
        &store.token_repo(),
        user.id,
        authentication_ttl(),
        Scope::Authentication,
    )
    .await
    .unwrap();
    (user, token.plaintext)
}
