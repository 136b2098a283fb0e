use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};

use moviego_core::envelope::Envelope;
use moviego_core::extract::JsonBody;
use moviego_domain::user::User;

use crate::error::ApiError;
use crate::handlers::expected_version;
use crate::infra::mail::{MailSender, MailTemplate};
use crate::middleware::authenticate::CurrentUser;
use crate::state::AppState;
use crate::usecase::user::{
    ActivateUserUseCase, RegisterUserInput, RegisterUserUseCase, UpdateProfileInput,
    UpdateProfileUseCase,
};

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    #[serde(serialize_with = "moviego_core::serde::to_rfc3339")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub name: String,
    pub email: String,
    pub activated: bool,
    pub version: i32,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            created_at: user.created_at,
            name: user.name,
            email: user.email,
            activated: user.activated,
            version: user.version,
        }
    }
}

type UserEnvelope = Json<Envelope<UserResponse>>;

fn user_envelope(user: User) -> UserEnvelope {
    Json(Envelope::new("user", user.into()))
}

// ── POST /v1/users ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn register_user(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, UserEnvelope), ApiError> {
    let usecase = RegisterUserUseCase {
        users: state.user_repo(),
        permissions: state.permission_repo(),
        tokens: state.token_repo(),
    };
    let output = usecase
        .execute(RegisterUserInput {
            name: body.name,
            email: body.email,
            password: body.password,
        })
        .await?;

    let mailer = state.mailer.clone();
    let recipient = output.user.email.clone();
    let template = MailTemplate::UserWelcome {
        user_id: output.user.id,
        activation_token: output.activation_token.plaintext,
    };
    state.background.spawn(template.name(), async move {
        mailer.send(&recipient, &template).await
    });

    Ok((StatusCode::CREATED, user_envelope(output.user)))
}

// ── PUT /v1/users/activated ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivateRequest {
    #[serde(default)]
    pub token: String,
}

pub async fn activate_user(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ActivateRequest>,
) -> Result<UserEnvelope, ApiError> {
    let usecase = ActivateUserUseCase {
        users: state.user_repo(),
        tokens: state.token_repo(),
    };
    let user = usecase.execute(&body.token).await?;
    Ok(user_envelope(user))
}

// ── GET /v1/users/me ──────────────────────────────────────────────────────────

pub async fn get_me(CurrentUser(user): CurrentUser) -> UserEnvelope {
    user_envelope(user)
}

// ── PATCH /v1/users/me ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    pub password: Option<String>,
}

pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
    JsonBody(body): JsonBody<UpdateMeRequest>,
) -> Result<UserEnvelope, ApiError> {
    let usecase = UpdateProfileUseCase {
        users: state.user_repo(),
    };
    let user = usecase
        .execute(
            user,
            UpdateProfileInput {
                name: body.name,
                password: body.password,
                expected_version: expected_version(&headers)?,
            },
        )
        .await?;
    Ok(user_envelope(user))
}
