//! Backend selection. Each store enum forwards to the Postgres or in-memory
//! repository chosen at startup, keeping handler futures concrete.

use std::time::Duration;

use sea_orm::DatabaseConnection;

use moviego_domain::movie::{Movie, MovieFilter, NewMovie};
use moviego_domain::pagination::Filters;
use moviego_domain::permission::Permissions;
use moviego_domain::token::Scope;
use moviego_domain::user::{NewUser, User};

use crate::domain::repository::{
    MovieRepository, PermissionRepository, TokenRepository, UserRepository,
};
use crate::domain::types::Token;
use crate::error::ApiError;
use crate::infra::db::{
    DbMovieRepository, DbPermissionRepository, DbTokenRepository, DbUserRepository,
};
use crate::infra::memory::{
    MemoryMovieRepository, MemoryPermissionRepository, MemoryStore, MemoryTokenRepository,
    MemoryUserRepository,
};

#[derive(Clone)]
pub enum Backend {
    Postgres {
        db: DatabaseConnection,
        query_timeout: Duration,
    },
    Memory(MemoryStore),
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Postgres { .. } => "postgres",
            Self::Memory(_) => "memory",
        }
    }

    pub fn movies(&self) -> MovieStore {
        match self {
            Self::Postgres { db, query_timeout } => MovieStore::Db(DbMovieRepository {
                db: db.clone(),
                timeout: *query_timeout,
            }),
            Self::Memory(store) => MovieStore::Memory(store.movie_repo()),
        }
    }

    pub fn users(&self) -> UserStore {
        match self {
            Self::Postgres { db, query_timeout } => UserStore::Db(DbUserRepository {
                db: db.clone(),
                timeout: *query_timeout,
            }),
            Self::Memory(store) => UserStore::Memory(store.user_repo()),
        }
    }

    pub fn tokens(&self) -> TokenStore {
        match self {
            Self::Postgres { db, query_timeout } => TokenStore::Db(DbTokenRepository {
                db: db.clone(),
                timeout: *query_timeout,
            }),
            Self::Memory(store) => TokenStore::Memory(store.token_repo()),
        }
    }

    pub fn permissions(&self) -> PermissionStore {
        match self {
            Self::Postgres { db, query_timeout } => PermissionStore::Db(DbPermissionRepository {
                db: db.clone(),
                timeout: *query_timeout,
            }),
            Self::Memory(store) => PermissionStore::Memory(store.permission_repo()),
        }
    }
}

// ── Movies ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub enum MovieStore {
    Db(DbMovieRepository),
    Memory(MemoryMovieRepository),
}

impl MovieRepository for MovieStore {
    async fn insert(&self, movie: &NewMovie) -> Result<Movie, ApiError> {
        match self {
            Self::Db(repo) => repo.insert(movie).await,
            Self::Memory(repo) => repo.insert(movie).await,
        }
    }

    async fn get(&self, id: i64) -> Result<Movie, ApiError> {
        match self {
            Self::Db(repo) => repo.get(id).await,
            Self::Memory(repo) => repo.get(id).await,
        }
    }

    async fn update(&self, movie: &Movie) -> Result<i32, ApiError> {
        match self {
            Self::Db(repo) => repo.update(movie).await,
            Self::Memory(repo) => repo.update(movie).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        match self {
            Self::Db(repo) => repo.delete(id).await,
            Self::Memory(repo) => repo.delete(id).await,
        }
    }

    async fn list(
        &self,
        filter: &MovieFilter,
        filters: &Filters,
    ) -> Result<(Vec<Movie>, u64), ApiError> {
        match self {
            Self::Db(repo) => repo.list(filter, filters).await,
            Self::Memory(repo) => repo.list(filter, filters).await,
        }
    }
}

// ── Users ─────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub enum UserStore {
    Db(DbUserRepository),
    Memory(MemoryUserRepository),
}

impl UserRepository for UserStore {
    async fn insert(&self, user: &NewUser) -> Result<User, ApiError> {
        match self {
            Self::Db(repo) => repo.insert(user).await,
            Self::Memory(repo) => repo.insert(user).await,
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<User, ApiError> {
        match self {
            Self::Db(repo) => repo.get_by_email(email).await,
            Self::Memory(repo) => repo.get_by_email(email).await,
        }
    }

    async fn update(&self, user: &User) -> Result<i32, ApiError> {
        match self {
            Self::Db(repo) => repo.update(user).await,
            Self::Memory(repo) => repo.update(user).await,
        }
    }

    async fn get_for_token(&self, scope: Scope, plaintext: &str) -> Result<User, ApiError> {
        match self {
            Self::Db(repo) => repo.get_for_token(scope, plaintext).await,
            Self::Memory(repo) => repo.get_for_token(scope, plaintext).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        match self {
            Self::Db(repo) => repo.delete(id).await,
            Self::Memory(repo) => repo.delete(id).await,
        }
    }
}

// ── Tokens ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub enum TokenStore {
    Db(DbTokenRepository),
    Memory(MemoryTokenRepository),
}

impl TokenRepository for TokenStore {
    async fn insert(&self, token: &Token) -> Result<(), ApiError> {
        match self {
            Self::Db(repo) => repo.insert(token).await,
            Self::Memory(repo) => repo.insert(token).await,
        }
    }

    async fn delete_all_for_user(&self, scope: Scope, user_id: i64) -> Result<(), ApiError> {
        match self {
            Self::Db(repo) => repo.delete_all_for_user(scope, user_id).await,
            Self::Memory(repo) => repo.delete_all_for_user(scope, user_id).await,
        }
    }
}

// ── Permissions ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub enum PermissionStore {
    Db(DbPermissionRepository),
    Memory(MemoryPermissionRepository),
}

impl PermissionRepository for PermissionStore {
    async fn get_all_for_user(&self, user_id: i64) -> Result<Permissions, ApiError> {
        match self {
            Self::Db(repo) => repo.get_all_for_user(user_id).await,
            Self::Memory(repo) => repo.get_all_for_user(user_id).await,
        }
    }

    async fn add_for_user(&self, user_id: i64, codes: &[&str]) -> Result<(), ApiError> {
        match self {
            Self::Db(repo) => repo.add_for_user(user_id, codes).await,
            Self::Memory(repo) => repo.add_for_user(user_id, codes).await,
        }
    }
}
