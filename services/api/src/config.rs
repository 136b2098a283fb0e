use std::time::Duration;

use clap::{Parser, ValueEnum};

use moviego_core::rate_limit::RateLimitConfig;

use crate::infra::db::DbOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Movie API configuration. Every flag can also come from the named environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "api", version, about = "Moviego JSON API server")]
pub struct ApiConfig {
    /// API server port
    #[arg(long, env = "PORT", default_value_t = 4000)]
    pub port: u16,

    /// Environment reported by the healthcheck
    #[arg(long = "env", env = "APP_ENV", value_enum, default_value_t = Environment::Development)]
    pub environment: Environment,

    /// Record store backend
    #[arg(long, env = "STORE_BACKEND", value_enum, default_value_t = StoreBackend::Postgres)]
    pub store: StoreBackend,

    /// PostgreSQL DSN, required for the postgres store
    #[arg(long, env = "MOVIEGO_DB_DSN", hide_env_values = true)]
    pub db_dsn: Option<String>,

    /// PostgreSQL max open connections
    #[arg(long, env = "DB_MAX_OPEN_CONNS", default_value_t = 25)]
    pub db_max_open_conns: u32,

    /// PostgreSQL max idle connections
    #[arg(long, env = "DB_MAX_IDLE_CONNS", default_value_t = 25)]
    pub db_max_idle_conns: u32,

    /// PostgreSQL max connection idle time, seconds
    #[arg(long, env = "DB_MAX_IDLE_TIME", default_value_t = 900)]
    pub db_max_idle_time: u64,

    /// Per-call store timeout, seconds
    #[arg(long, env = "DB_QUERY_TIMEOUT", default_value_t = 3)]
    pub db_query_timeout: u64,

    /// Rate limiter maximum requests per second
    #[arg(long, env = "LIMITER_RPS", default_value_t = 2.0)]
    pub limiter_rps: f64,

    /// Rate limiter maximum burst
    #[arg(long, env = "LIMITER_BURST", default_value_t = 4)]
    pub limiter_burst: u32,

    /// Enable rate limiter
    #[arg(
        long,
        env = "LIMITER_ENABLED",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub limiter_enabled: bool,

    /// Trusted CORS origins (space separated)
    #[arg(long, env = "CORS_TRUSTED_ORIGINS", value_delimiter = ' ', num_args = 0..)]
    pub cors_trusted_origins: Vec<String>,

    /// Transactional mail API endpoint; mail is only logged when unset
    #[arg(long, env = "MAIL_API_URL")]
    pub mail_api_url: Option<String>,

    /// Transactional mail API key
    #[arg(long, env = "MAIL_API_KEY", hide_env_values = true, default_value = "")]
    pub mail_api_key: String,

    /// Mail sender, a bare address or `Name <address>`
    #[arg(long, env = "MAIL_SENDER", default_value = "Moviego <no-reply@moviego.local>")]
    pub mail_sender: String,

    /// Overall shutdown budget for in-flight requests and background work, seconds
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 5)]
    pub shutdown_timeout: u64,
}

impl ApiConfig {
    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            rps: self.limiter_rps,
            burst: self.limiter_burst,
            enabled: self.limiter_enabled,
        }
    }

    /// Pool settings for the postgres store. `None` when no DSN was given.
    pub fn db_options(&self) -> Option<DbOptions> {
        let dsn = self.db_dsn.clone().filter(|d| !d.is_empty())?;
        Some(DbOptions {
            dsn,
            max_open_conns: self.db_max_open_conns,
            max_idle_conns: self.db_max_idle_conns,
            max_idle_time: Duration::from_secs(self.db_max_idle_time),
            query_timeout: self.query_timeout(),
        })
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.db_query_timeout)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }

    pub fn trusted_origins(&self) -> Vec<String> {
        self.cors_trusted_origins
            .iter()
            .filter(|o| !o.is_empty())
            .cloned()
            .collect()
    }
}
