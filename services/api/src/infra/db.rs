//! Postgres-backed repositories.
//!
//! Every call is bounded by the configured query timeout. Timeouts and lost
//! connections surface as [`ApiError::StoreUnavailable`]; anything else the
//! driver reports is internal.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context as _, anyhow};
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectOptions, ConnectionTrait, Database,
    DatabaseConnection, DbErr, EntityTrait, FromQueryResult, QueryFilter, SqlErr, Statement,
};

use moviego_api_schema::{movies, tokens, users};
use moviego_domain::movie::{Movie, MovieFilter, NewMovie};
use moviego_domain::pagination::Filters;
use moviego_domain::permission::Permissions;
use moviego_domain::token::Scope;
use moviego_domain::user::{NewUser, User};

use crate::domain::credential::hash_token;
use crate::domain::repository::{
    MovieRepository, PermissionRepository, TokenRepository, UserRepository,
};
use crate::domain::types::Token;
use crate::error::ApiError;

/// Pool settings passed to [`connect`].
#[derive(Debug, Clone)]
pub struct DbOptions {
    pub dsn: String,
    pub max_open_conns: u32,
    pub max_idle_conns: u32,
    pub max_idle_time: Duration,
    pub query_timeout: Duration,
}

pub async fn connect(opts: &DbOptions) -> anyhow::Result<DatabaseConnection> {
    let mut connect = ConnectOptions::new(opts.dsn.clone());
    connect
        .max_connections(opts.max_open_conns)
        .min_connections(opts.max_idle_conns.min(opts.max_open_conns))
        .idle_timeout(opts.max_idle_time)
        .acquire_timeout(opts.query_timeout)
        .sqlx_logging(false);
    let db = Database::connect(connect)
        .await
        .context("connect to postgres")?;
    tokio::time::timeout(opts.query_timeout, db.ping())
        .await
        .map_err(|_| anyhow!("postgres ping timed out"))?
        .context("ping postgres")?;
    Ok(db)
}

// ── Call bounding ─────────────────────────────────────────────────────────────

#[derive(Debug)]
enum StoreFault {
    TimedOut(Duration),
    Db(DbErr),
}

impl StoreFault {
    fn is_unique_violation(&self) -> bool {
        match self {
            Self::Db(e) => matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))),
            Self::TimedOut(_) => false,
        }
    }

    fn into_api(self, what: &'static str) -> ApiError {
        match self {
            Self::TimedOut(limit) => {
                ApiError::StoreUnavailable(anyhow!("{what}: timed out after {limit:?}"))
            }
            Self::Db(e @ (DbErr::ConnectionAcquire(_) | DbErr::Conn(_))) => {
                ApiError::StoreUnavailable(anyhow::Error::new(e).context(what))
            }
            Self::Db(e) => ApiError::Internal(anyhow::Error::new(e).context(what)),
        }
    }
}

async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, StoreFault>
where
    F: Future<Output = Result<T, DbErr>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreFault::TimedOut(limit))?
        .map_err(StoreFault::Db)
}

fn duplicate_email_or(what: &'static str) -> impl FnOnce(StoreFault) -> ApiError {
    move |fault| {
        if fault.is_unique_violation() {
            ApiError::DuplicateEmail
        } else {
            fault.into_api(what)
        }
    }
}

// ── Movie repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbMovieRepository {
    pub db: DatabaseConnection,
    pub timeout: Duration,
}

#[derive(Debug, FromQueryResult)]
struct MovieRow {
    total: i64,
    id: i64,
    created_at: chrono::DateTime<Utc>,
    title: String,
    year: i32,
    runtime: i32,
    genres: Vec<String>,
    version: i32,
}

impl MovieRepository for DbMovieRepository {
    async fn insert(&self, movie: &NewMovie) -> Result<Movie, ApiError> {
        let model = bounded(
            self.timeout,
            movies::ActiveModel {
                title: Set(movie.title.clone()),
                year: Set(movie.year),
                runtime: Set(movie.runtime),
                genres: Set(movie.genres.clone()),
                ..Default::default()
            }
            .insert(&self.db),
        )
        .await
        .map_err(|e| e.into_api("insert movie"))?;
        Ok(movie_from_model(model))
    }

    async fn get(&self, id: i64) -> Result<Movie, ApiError> {
        let model = bounded(self.timeout, movies::Entity::find_by_id(id).one(&self.db))
            .await
            .map_err(|e| e.into_api("get movie"))?;
        model.map(movie_from_model).ok_or(ApiError::NotFound)
    }

    async fn update(&self, movie: &Movie) -> Result<i32, ApiError> {
        let stmt = Statement::from_sql_and_values(
            self.db.get_database_backend(),
            r#"
            UPDATE movies
            SET title = $1, year = $2, runtime = $3, genres = $4, version = version + 1
            WHERE id = $5 AND version = $6
            RETURNING version
            "#,
            [
                movie.title.clone().into(),
                movie.year.into(),
                movie.runtime.into(),
                movie.genres.clone().into(),
                movie.id.into(),
                movie.version.into(),
            ],
        );
        let row = bounded(self.timeout, self.db.query_one(stmt))
            .await
            .map_err(|e| e.into_api("update movie"))?
            .ok_or(ApiError::EditConflict)?;
        Ok(row
            .try_get::<i32>("", "version")
            .context("read updated movie version")?)
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let result = bounded(self.timeout, movies::Entity::delete_by_id(id).exec(&self.db))
            .await
            .map_err(|e| e.into_api("delete movie"))?;
        if result.rows_affected == 0 {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }

    async fn list(
        &self,
        filter: &MovieFilter,
        filters: &Filters,
    ) -> Result<(Vec<Movie>, u64), ApiError> {
        // Column and direction come from closed enums, never from client text.
        let sql = format!(
            r#"
            SELECT count(*) OVER() AS total, id, created_at, title, year, runtime, genres, version
            FROM movies
            WHERE (to_tsvector('simple', title) @@ plainto_tsquery('simple', $1) OR $1 = '')
              AND (genres @> $2 OR $2 = '{{}}')
            ORDER BY {column} {direction}, id ASC
            LIMIT $3 OFFSET $4
            "#,
            column = filters.sort.column.as_str(),
            direction = filters.sort.direction.as_sql(),
        );
        let limit = i64::try_from(filters.limit()).context("page size overflows i64")?;
        let offset = i64::try_from(filters.offset()).context("page offset overflows i64")?;

        let rows = bounded(
            self.timeout,
            MovieRow::find_by_statement(Statement::from_sql_and_values(
                self.db.get_database_backend(),
                &sql,
                [
                    filter.title.clone().into(),
                    filter.genres.clone().into(),
                    limit.into(),
                    offset.into(),
                ],
            ))
            .all(&self.db),
        )
        .await
        .map_err(|e| e.into_api("list movies"))?;

        let total = rows.first().map_or(0, |r| r.total.max(0) as u64);
        let movies = rows
            .into_iter()
            .map(|r| Movie {
                id: r.id,
                created_at: r.created_at,
                title: r.title,
                year: r.year,
                runtime: r.runtime,
                genres: r.genres,
                version: r.version,
            })
            .collect();
        Ok((movies, total))
    }
}

fn movie_from_model(model: movies::Model) -> Movie {
    Movie {
        id: model.id,
        created_at: model.created_at,
        title: model.title,
        year: model.year,
        runtime: model.runtime,
        genres: model.genres,
        version: model.version,
    }
}

// ── User repository ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: DatabaseConnection,
    pub timeout: Duration,
}

impl UserRepository for DbUserRepository {
    async fn insert(&self, user: &NewUser) -> Result<User, ApiError> {
        let model = bounded(
            self.timeout,
            users::ActiveModel {
                name: Set(user.name.clone()),
                email: Set(user.email.clone()),
                password_hash: Set(user.password_hash.clone()),
                activated: Set(user.activated),
                ..Default::default()
            }
            .insert(&self.db),
        )
        .await
        .map_err(duplicate_email_or("insert user"))?;
        Ok(user_from_model(model))
    }

    async fn get_by_email(&self, email: &str) -> Result<User, ApiError> {
        let model = bounded(
            self.timeout,
            users::Entity::find()
                .filter(
                    Expr::expr(Func::lower(Expr::col(users::Column::Email)))
                        .eq(email.to_lowercase()),
                )
                .one(&self.db),
        )
        .await
        .map_err(|e| e.into_api("get user by email"))?;
        model.map(user_from_model).ok_or(ApiError::NotFound)
    }

    async fn update(&self, user: &User) -> Result<i32, ApiError> {
        let stmt = Statement::from_sql_and_values(
            self.db.get_database_backend(),
            r#"
            UPDATE users
            SET name = $1, email = $2, password_hash = $3, activated = $4, version = version + 1
            WHERE id = $5 AND version = $6
            RETURNING version
            "#,
            [
                user.name.clone().into(),
                user.email.clone().into(),
                user.password_hash.clone().into(),
                user.activated.into(),
                user.id.into(),
                user.version.into(),
            ],
        );
        let row = bounded(self.timeout, self.db.query_one(stmt))
            .await
            .map_err(duplicate_email_or("update user"))?
            .ok_or(ApiError::EditConflict)?;
        Ok(row
            .try_get::<i32>("", "version")
            .context("read updated user version")?)
    }

    async fn get_for_token(&self, scope: Scope, plaintext: &str) -> Result<User, ApiError> {
        let stmt = Statement::from_sql_and_values(
            self.db.get_database_backend(),
            r#"
            SELECT users.id, users.created_at, users.name, users.email,
                   users.password_hash, users.activated, users.version
            FROM users
            INNER JOIN tokens ON users.id = tokens.user_id
            WHERE tokens.hash = $1 AND tokens.scope = $2 AND tokens.expiry > $3
            "#,
            [
                hash_token(plaintext).into(),
                scope.as_str().into(),
                Utc::now().into(),
            ],
        );
        let model = bounded(
            self.timeout,
            users::Entity::find().from_raw_sql(stmt).one(&self.db),
        )
        .await
        .map_err(|e| e.into_api("get user for token"))?;
        model.map(user_from_model).ok_or(ApiError::NotFound)
    }

    // Tokens and permission grants go with the row (ON DELETE CASCADE).
    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let result = bounded(self.timeout, users::Entity::delete_by_id(id).exec(&self.db))
            .await
            .map_err(|e| e.into_api("delete user"))?;
        if result.rows_affected == 0 {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }
}

fn user_from_model(model: users::Model) -> User {
    User {
        id: model.id,
        created_at: model.created_at,
        name: model.name,
        email: model.email,
        password_hash: model.password_hash,
        activated: model.activated,
        version: model.version,
    }
}

// ── Token repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbTokenRepository {
    pub db: DatabaseConnection,
    pub timeout: Duration,
}

impl TokenRepository for DbTokenRepository {
    async fn insert(&self, token: &Token) -> Result<(), ApiError> {
        let row = tokens::ActiveModel {
            hash: Set(token.hash.clone()),
            user_id: Set(token.user_id),
            expiry: Set(token.expiry),
            scope: Set(token.scope.as_str().to_owned()),
        };
        bounded(
            self.timeout,
            tokens::Entity::insert(row).exec_without_returning(&self.db),
        )
        .await
        .map_err(|e| e.into_api("insert token"))?;
        Ok(())
    }

    async fn delete_all_for_user(&self, scope: Scope, user_id: i64) -> Result<(), ApiError> {
        bounded(
            self.timeout,
            tokens::Entity::delete_many()
                .filter(tokens::Column::Scope.eq(scope.as_str()))
                .filter(tokens::Column::UserId.eq(user_id))
                .exec(&self.db),
        )
        .await
        .map_err(|e| e.into_api("delete tokens for user"))?;
        Ok(())
    }
}

// ── Permission repository ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbPermissionRepository {
    pub db: DatabaseConnection,
    pub timeout: Duration,
}

#[derive(Debug, FromQueryResult)]
struct CodeRow {
    code: String,
}

impl PermissionRepository for DbPermissionRepository {
    async fn get_all_for_user(&self, user_id: i64) -> Result<Permissions, ApiError> {
        let rows = bounded(
            self.timeout,
            CodeRow::find_by_statement(Statement::from_sql_and_values(
                self.db.get_database_backend(),
                r#"
                SELECT permissions.code
                FROM permissions
                INNER JOIN users_permissions ON users_permissions.permission_id = permissions.id
                WHERE users_permissions.user_id = $1
                "#,
                [user_id.into()],
            ))
            .all(&self.db),
        )
        .await
        .map_err(|e| e.into_api("get permissions for user"))?;
        Ok(rows.into_iter().map(|r| r.code).collect())
    }

    async fn add_for_user(&self, user_id: i64, codes: &[&str]) -> Result<(), ApiError> {
        let codes: Vec<String> = codes.iter().map(|c| (*c).to_owned()).collect();
        let stmt = Statement::from_sql_and_values(
            self.db.get_database_backend(),
            r#"
            INSERT INTO users_permissions
            SELECT $1, permissions.id FROM permissions WHERE permissions.code = ANY($2)
            ON CONFLICT DO NOTHING
            "#,
            [user_id.into(), codes.into()],
        );
        bounded(self.timeout, self.db.execute(stmt))
            .await
            .map_err(|e| e.into_api("add permissions for user"))?;
        Ok(())
    }
}
