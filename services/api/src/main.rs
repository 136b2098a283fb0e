use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use moviego_core::background::BackgroundTasks;
use moviego_core::cors::TrustedOrigins;
use moviego_core::health::SystemInfo;
use moviego_core::metrics::Metrics;
use moviego_core::rate_limit::RateLimiter;
use moviego_core::tracing::init_tracing;

use moviego_api::config::{ApiConfig, StoreBackend};
use moviego_api::infra::db::connect;
use moviego_api::infra::mail::{HttpMailer, LogMailer, Mailer};
use moviego_api::infra::memory::MemoryStore;
use moviego_api::infra::store::Backend;
use moviego_api::router::build_router;
use moviego_api::server::serve;
use moviego_api::state::AppState;

const SWEEP_EVERY: Duration = Duration::from_secs(60);
const SWEEP_IDLE: Duration = Duration::from_secs(180);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let config = ApiConfig::parse();

    let backend = match config.store {
        StoreBackend::Postgres => {
            let opts = config
                .db_options()
                .context("--db-dsn / MOVIEGO_DB_DSN is required for the postgres store")?;
            let db = connect(&opts).await?;
            info!(max_open_conns = opts.max_open_conns, "database connection pool established");
            Backend::Postgres {
                db,
                query_timeout: opts.query_timeout,
            }
        }
        StoreBackend::Memory => Backend::Memory(MemoryStore::new()),
    };

    let mailer = match &config.mail_api_url {
        Some(url) if !url.is_empty() => Mailer::Http(HttpMailer::new(
            url.clone(),
            config.mail_api_key.clone(),
            config.mail_sender.clone(),
        )?),
        _ => Mailer::Log(LogMailer),
    };

    let limiter = Arc::new(RateLimiter::new(config.rate_limit()));
    let sweeper = limiter.spawn_sweeper(SWEEP_EVERY, SWEEP_IDLE);
    let background = BackgroundTasks::new();

    let state = AppState {
        backend,
        mailer,
        background: background.clone(),
        limiter,
        metrics: Arc::new(Metrics::new()),
        origins: TrustedOrigins::new(config.trusted_origins()),
        system_info: SystemInfo {
            environment: config.environment.as_str().to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        },
    };
    let store = state.backend.name();
    let router = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;

    info!(%addr, env = config.environment.as_str(), store, "starting server");
    let report = serve(
        listener,
        router,
        shutdown_signal(),
        &background,
        config.shutdown_timeout(),
    )
    .await?;
    sweeper.abort();
    info!(
        requests_abandoned = report.requests_abandoned,
        completed = report.background.completed,
        aborted = report.background.aborted,
        "stopped server"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "unable to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!(signal = "SIGINT", "shutting down server"),
        () = terminate => info!(signal = "SIGTERM", "shutting down server"),
    }
}
