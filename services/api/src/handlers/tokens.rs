use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use moviego_core::envelope::Envelope;
use moviego_core::extract::JsonBody;

use crate::error::ApiError;
use crate::state::AppState;
use crate::usecase::token::{CreateAuthenticationTokenInput, CreateAuthenticationTokenUseCase};

// ── POST /v1/tokens/authentication ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTokenRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    #[serde(serialize_with = "moviego_core::serde::to_rfc3339")]
    pub expiry: chrono::DateTime<chrono::Utc>,
}

pub async fn create_authentication_token(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateTokenRequest>,
) -> Result<(StatusCode, Json<Envelope<TokenResponse>>), ApiError> {
    let usecase = CreateAuthenticationTokenUseCase {
        users: state.user_repo(),
        tokens: state.token_repo(),
    };
    let token = usecase
        .execute(CreateAuthenticationTokenInput {
            email: body.email,
            password: body.password,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::new(
            "authentication_token",
            TokenResponse {
                token: token.plaintext,
                expiry: token.expiry,
            },
        )),
    ))
}
