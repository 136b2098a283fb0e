use moviego_domain::permission::MOVIES_READ;
use moviego_domain::token::{Scope, validate_token_plaintext};
use moviego_domain::user::{
    NewUser, User, validate_email, validate_name, validate_password_plaintext,
};
use moviego_domain::validator::Validator;

use crate::domain::credential::hash_password;
use crate::domain::repository::{PermissionRepository, TokenRepository, UserRepository};
use crate::domain::types::Token;
use crate::error::ApiError;
use crate::usecase::token::{activation_ttl, issue_token};

// ── RegisterUser ──────────────────────────────────────────────────────────────

pub struct RegisterUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct RegisterUserOutput {
    pub user: User,
    pub activation_token: Token,
}

pub struct RegisterUserUseCase<U, P, T>
where
    U: UserRepository,
    P: PermissionRepository,
    T: TokenRepository,
{
    pub users: U,
    pub permissions: P,
    pub tokens: T,
}

impl<U, P, T> RegisterUserUseCase<U, P, T>
where
    U: UserRepository,
    P: PermissionRepository,
    T: TokenRepository,
{
    /// Create an inactive account with read access and an activation token.
    /// Sending the welcome mail is left to the caller.
    pub async fn execute(&self, input: RegisterUserInput) -> Result<RegisterUserOutput, ApiError> {
        let mut v = Validator::new();
        validate_name(&mut v, &input.name);
        validate_email(&mut v, &input.email);
        validate_password_plaintext(&mut v, &input.password);
        v.finish()?;

        let password_hash = hash_password(input.password).await?;
        let user = self
            .users
            .insert(&NewUser {
                name: input.name,
                email: input.email,
                password_hash,
                activated: false,
            })
            .await?;

        match self.provision(user.id).await {
            Ok(activation_token) => Ok(RegisterUserOutput {
                user,
                activation_token,
            }),
            Err(e) => {
                // Registration is all or nothing.
                if let Err(undo) = self.users.delete(user.id).await {
                    tracing::error!(user_id = user.id, error = ?undo, "remove half-registered user");
                }
                Err(e)
            }
        }
    }

    async fn provision(&self, user_id: i64) -> Result<Token, ApiError> {
        self.permissions.add_for_user(user_id, &[MOVIES_READ]).await?;
        issue_token(&self.tokens, user_id, activation_ttl(), Scope::Activation).await
    }
}

// ── ActivateUser ──────────────────────────────────────────────────────────────

pub struct ActivateUserUseCase<U: UserRepository, T: TokenRepository> {
    pub users: U,
    pub tokens: T,
}

impl<U: UserRepository, T: TokenRepository> ActivateUserUseCase<U, T> {
    pub async fn execute(&self, token_plaintext: &str) -> Result<User, ApiError> {
        let mut v = Validator::new();
        validate_token_plaintext(&mut v, token_plaintext);
        v.finish()?;

        let mut user = match self.users.get_for_token(Scope::Activation, token_plaintext).await {
            Ok(user) => user,
            Err(ApiError::NotFound) => {
                return Err(ApiError::field("token", "invalid or expired activation token"));
            }
            Err(e) => return Err(e),
        };

        user.activated = true;
        user.version = self.users.update(&user).await?;

        // Any other outstanding activation tokens for this user die with this one.
        self.tokens
            .delete_all_for_user(Scope::Activation, user.id)
            .await?;
        Ok(user)
    }
}

// ── UpdateProfile ─────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct UpdateProfileInput {
    pub name: Option<String>,
    pub password: Option<String>,
    pub expected_version: Option<String>,
}

pub struct UpdateProfileUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> UpdateProfileUseCase<U> {
    /// Apply a partial update to `user` (the authenticated caller) under its current version.
    pub async fn execute(&self, mut user: User, input: UpdateProfileInput) -> Result<User, ApiError> {
        if let Some(expected) = input.expected_version {
            if expected != user.version.to_string() {
                return Err(ApiError::EditConflict);
            }
        }

        let mut v = Validator::new();
        if let Some(name) = &input.name {
            validate_name(&mut v, name);
        }
        if let Some(password) = &input.password {
            validate_password_plaintext(&mut v, password);
        }
        v.finish()?;

        if let Some(name) = input.name {
            user.name = name;
        }
        if let Some(password) = input.password {
            user.password_hash = hash_password(password).await?;
        }
        user.version = self.users.update(&user).await?;
        Ok(user)
    }
}
