//! In-process store with the same contract as the Postgres repositories.
//!
//! Selected with `--store memory` and used throughout the integration tests.
//! All tables live behind one mutex that is never held across an await.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use moviego_domain::movie::{Movie, MovieFilter, NewMovie};
use moviego_domain::pagination::{Filters, Sort, SortColumn};
use moviego_domain::permission::{MOVIES_READ, MOVIES_WRITE, Permissions};
use moviego_domain::token::Scope;
use moviego_domain::user::{NewUser, User};

use crate::domain::credential::hash_token;
use crate::domain::repository::{
    MovieRepository, PermissionRepository, TokenRepository, UserRepository,
};
use crate::domain::types::Token;
use crate::error::ApiError;

#[derive(Debug, Clone)]
struct StoredToken {
    user_id: i64,
    expiry: DateTime<Utc>,
    scope: Scope,
}

#[derive(Debug)]
struct Tables {
    movies: BTreeMap<i64, Movie>,
    next_movie_id: i64,
    users: BTreeMap<i64, User>,
    next_user_id: i64,
    tokens: HashMap<Vec<u8>, StoredToken>,
    known_permissions: BTreeSet<String>,
    grants: HashMap<i64, BTreeSet<String>>,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            movies: BTreeMap::new(),
            next_movie_id: 1,
            users: BTreeMap::new(),
            next_user_id: 1,
            tokens: HashMap::new(),
            known_permissions: [MOVIES_READ, MOVIES_WRITE]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            grants: HashMap::new(),
        }
    }
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        let email = email.to_lowercase();
        self.users
            .values()
            .any(|u| Some(u.id) != except && u.email.to_lowercase() == email)
    }
}

/// Shared handle to one set of in-memory tables. Clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn movie_repo(&self) -> MemoryMovieRepository {
        MemoryMovieRepository {
            store: self.clone(),
        }
    }

    pub fn user_repo(&self) -> MemoryUserRepository {
        MemoryUserRepository {
            store: self.clone(),
        }
    }

    pub fn token_repo(&self) -> MemoryTokenRepository {
        MemoryTokenRepository {
            store: self.clone(),
        }
    }

    pub fn permission_repo(&self) -> MemoryPermissionRepository {
        MemoryPermissionRepository {
            store: self.clone(),
        }
    }
}

// ── Movie repository ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MemoryMovieRepository {
    store: MemoryStore,
}

impl MovieRepository for MemoryMovieRepository {
    async fn insert(&self, movie: &NewMovie) -> Result<Movie, ApiError> {
        let mut tables = self.store.tables();
        let id = tables.next_movie_id;
        tables.next_movie_id += 1;
        let stored = Movie {
            id,
            created_at: Utc::now(),
            title: movie.title.clone(),
            year: movie.year,
            runtime: movie.runtime,
            genres: movie.genres.clone(),
            version: 1,
        };
        tables.movies.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: i64) -> Result<Movie, ApiError> {
        self.store
            .tables()
            .movies
            .get(&id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn update(&self, movie: &Movie) -> Result<i32, ApiError> {
        let mut tables = self.store.tables();
        let current = tables
            .movies
            .get_mut(&movie.id)
            .filter(|m| m.version == movie.version)
            .ok_or(ApiError::EditConflict)?;
        current.title = movie.title.clone();
        current.year = movie.year;
        current.runtime = movie.runtime;
        current.genres = movie.genres.clone();
        current.version += 1;
        Ok(current.version)
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.store
            .tables()
            .movies
            .remove(&id)
            .map(|_| ())
            .ok_or(ApiError::NotFound)
    }

    async fn list(
        &self,
        filter: &MovieFilter,
        filters: &Filters,
    ) -> Result<(Vec<Movie>, u64), ApiError> {
        let query = words(&filter.title);
        let mut matched: Vec<Movie> = self
            .store
            .tables()
            .movies
            .values()
            .filter(|m| {
                let title = words(&m.title);
                query.iter().all(|w| title.contains(w))
            })
            .filter(|m| filter.genres.iter().all(|g| m.genres.contains(g)))
            .cloned()
            .collect();

        matched.sort_by(|a, b| {
            let primary = match filters.sort.column {
                SortColumn::Id => a.id.cmp(&b.id),
                SortColumn::Title => a.title.cmp(&b.title),
                SortColumn::Year => a.year.cmp(&b.year),
                SortColumn::Runtime => a.runtime.cmp(&b.runtime),
            };
            let primary = match filters.sort.direction {
                Sort::Asc => primary,
                Sort::Desc => primary.reverse(),
            };
            match primary {
                Ordering::Equal => a.id.cmp(&b.id),
                other => other,
            }
        });

        let total = matched.len() as u64;
        let offset = usize::try_from(filters.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(filters.limit()).unwrap_or(usize::MAX);
        let page = matched.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }
}

/// Lowercased alphanumeric words, mirroring the `simple` text search configuration.
fn words(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

// ── User repository ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MemoryUserRepository {
    store: MemoryStore,
}

impl UserRepository for MemoryUserRepository {
    async fn insert(&self, user: &NewUser) -> Result<User, ApiError> {
        let mut tables = self.store.tables();
        if tables.email_taken(&user.email, None) {
            return Err(ApiError::DuplicateEmail);
        }
        let id = tables.next_user_id;
        tables.next_user_id += 1;
        let stored = User {
            id,
            created_at: Utc::now(),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            activated: user.activated,
            version: 1,
        };
        tables.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, ApiError> {
        let email = email.to_lowercase();
        self.store
            .tables()
            .users
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn update(&self, user: &User) -> Result<i32, ApiError> {
        let mut tables = self.store.tables();
        if tables.email_taken(&user.email, Some(user.id)) {
            return Err(ApiError::DuplicateEmail);
        }
        let current = tables
            .users
            .get_mut(&user.id)
            .filter(|u| u.version == user.version)
            .ok_or(ApiError::EditConflict)?;
        current.name = user.name.clone();
        current.email = user.email.clone();
        current.password_hash = user.password_hash.clone();
        current.activated = user.activated;
        current.version += 1;
        Ok(current.version)
    }

    async fn get_for_token(&self, scope: Scope, plaintext: &str) -> Result<User, ApiError> {
        let hash = hash_token(plaintext);
        let tables = self.store.tables();
        tables
            .tokens
            .get(&hash)
            .filter(|t| t.scope == scope && t.expiry > Utc::now())
            .and_then(|t| tables.users.get(&t.user_id))
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let mut tables = self.store.tables();
        tables.users.remove(&id).ok_or(ApiError::NotFound)?;
        tables.tokens.retain(|_, t| t.user_id != id);
        tables.grants.remove(&id);
        Ok(())
    }
}

// ── Token repository ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MemoryTokenRepository {
    store: MemoryStore,
}

impl TokenRepository for MemoryTokenRepository {
    async fn insert(&self, token: &Token) -> Result<(), ApiError> {
        let mut tables = self.store.tables();
        if !tables.users.contains_key(&token.user_id) {
            return Err(ApiError::Internal(anyhow::anyhow!(
                "insert token: user {} does not exist",
                token.user_id
            )));
        }
        tables.tokens.insert(
            token.hash.clone(),
            StoredToken {
                user_id: token.user_id,
                expiry: token.expiry,
                scope: token.scope,
            },
        );
        Ok(())
    }

    async fn delete_all_for_user(&self, scope: Scope, user_id: i64) -> Result<(), ApiError> {
        self.store
            .tables()
            .tokens
            .retain(|_, t| !(t.scope == scope && t.user_id == user_id));
        Ok(())
    }
}

// ── Permission repository ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MemoryPermissionRepository {
    store: MemoryStore,
}

impl PermissionRepository for MemoryPermissionRepository {
    async fn get_all_for_user(&self, user_id: i64) -> Result<Permissions, ApiError> {
        Ok(self
            .store
            .tables()
            .grants
            .get(&user_id)
            .map(|codes| codes.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn add_for_user(&self, user_id: i64, codes: &[&str]) -> Result<(), ApiError> {
        let mut tables = self.store.tables();
        let known: Vec<String> = codes
            .iter()
            .filter(|c| tables.known_permissions.contains(**c))
            .map(|c| (*c).to_owned())
            .collect();
        tables.grants.entry(user_id).or_default().extend(known);
        Ok(())
    }
}
