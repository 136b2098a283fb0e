#![allow(async_fn_in_trait)]

use moviego_domain::movie::{Movie, MovieFilter, NewMovie};
use moviego_domain::pagination::Filters;
use moviego_domain::permission::Permissions;
use moviego_domain::token::Scope;
use moviego_domain::user::{NewUser, User};

use crate::domain::types::Token;
use crate::error::ApiError;

/// Versioned movie records.
///
/// `update` is conditioned on the caller's `(id, version)`; a stale version
/// yields [`ApiError::EditConflict`] and nothing is written.
pub trait MovieRepository: Send + Sync {
    /// Store a validated movie. The returned record has its id, creation time and version 1.
    async fn insert(&self, movie: &NewMovie) -> Result<Movie, ApiError>;

    async fn get(&self, id: i64) -> Result<Movie, ApiError>;

    /// Write every field of `movie` and return the new version.
    async fn update(&self, movie: &Movie) -> Result<i32, ApiError>;

    async fn delete(&self, id: i64) -> Result<(), ApiError>;

    /// One page of matches plus the total count before paging.
    async fn list(
        &self,
        filter: &MovieFilter,
        filters: &Filters,
    ) -> Result<(Vec<Movie>, u64), ApiError>;
}

/// User accounts. Emails are unique regardless of case.
pub trait UserRepository: Send + Sync {
    /// Fails with [`ApiError::DuplicateEmail`] when the address is taken.
    async fn insert(&self, user: &NewUser) -> Result<User, ApiError>;

    async fn get_by_email(&self, email: &str) -> Result<User, ApiError>;

    /// Version-checked write. Returns the new version.
    async fn update(&self, user: &User) -> Result<i32, ApiError>;

    /// Owner of an unexpired token with this plaintext and scope, else `NotFound`.
    async fn get_for_token(&self, scope: Scope, plaintext: &str) -> Result<User, ApiError>;

    /// Remove the account along with its tokens and grants. `NotFound` if absent.
    async fn delete(&self, id: i64) -> Result<(), ApiError>;
}

pub trait TokenRepository: Send + Sync {
    /// Persist the hash, owner, expiry and scope. Never the plaintext.
    async fn insert(&self, token: &Token) -> Result<(), ApiError>;

    async fn delete_all_for_user(&self, scope: Scope, user_id: i64) -> Result<(), ApiError>;
}

pub trait PermissionRepository: Send + Sync {
    async fn get_all_for_user(&self, user_id: i64) -> Result<Permissions, ApiError>;

    /// Idempotent. Unknown codes are ignored.
    async fn add_for_user(&self, user_id: i64, codes: &[&str]) -> Result<(), ApiError>;
}
