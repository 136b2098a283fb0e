use chrono::Duration;

use moviego_domain::token::Scope;
use moviego_domain::user::{validate_email, validate_password_plaintext};
use moviego_domain::validator::Validator;

use crate::domain::credential::{generate_token, verify_password};
use crate::domain::repository::{TokenRepository, UserRepository};
use crate::domain::types::Token;
use crate::error::ApiError;

pub fn activation_ttl() -> Duration {
    Duration::days(3)
}

pub fn authentication_ttl() -> Duration {
    Duration::hours(24)
}

// ── IssueToken ────────────────────────────────────────────────────────────────

/// Generate and persist a token. The plaintext is only in the returned value.
pub async fn issue_token<T: TokenRepository>(
    tokens: &T,
    user_id: i64,
    ttl: Duration,
    scope: Scope,
) -> Result<Token, ApiError> {
    let token = generate_token(user_id, ttl, scope);
    tokens.insert(&token).await?;
    tracing::debug!(user_id, %scope, expiry = %token.expiry, "token issued");
    Ok(token)
}

// ── CreateAuthenticationToken (login) ─────────────────────────────────────────

pub struct CreateAuthenticationTokenInput {
    pub email: String,
    pub password: String,
}

pub struct CreateAuthenticationTokenUseCase<U: UserRepository, T: TokenRepository> {
    pub users: U,
    pub tokens: T,
}

impl<U: UserRepository, T: TokenRepository> CreateAuthenticationTokenUseCase<U, T> {
    pub async fn execute(&self, input: CreateAuthenticationTokenInput) -> Result<Token, ApiError> {
        let mut v = Validator::new();
        validate_email(&mut v, &input.email);
        validate_password_plaintext(&mut v, &input.password);
        v.finish()?;

        let user = match self.users.get_by_email(&input.email).await {
            Ok(user) => user,
            Err(ApiError::NotFound) => return Err(ApiError::InvalidCredentials),
            Err(e) => return Err(e),
        };
        if !verify_password(input.password, user.password_hash).await? {
            return Err(ApiError::InvalidCredentials);
        }

        issue_token(
            &self.tokens,
            user.id,
            authentication_ttl(),
            Scope::Authentication,
        )
        .await
    }
}
