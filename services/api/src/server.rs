//! Serving and graceful shutdown.
//!
//! One budget covers the whole shutdown: in-flight requests get what they need
//! of it, background tasks get the rest.

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{info, warn};

use moviego_core::background::{BackgroundTasks, DrainReport};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// In-flight requests were still running at the deadline and were dropped.
    pub requests_abandoned: bool,
    pub background: DrainReport,
}

/// Serve `router` until `signal` resolves, then stop within `budget`.
pub async fn serve<S>(
    listener: TcpListener,
    router: Router,
    signal: S,
    background: &BackgroundTasks,
    budget: Duration,
) -> anyhow::Result<ShutdownReport>
where
    S: Future<Output = ()> + Send + 'static,
{
    let (fired_tx, mut fired) = oneshot::channel::<Instant>();
    let signal = async move {
        signal.await;
        let _ = fired_tx.send(Instant::now());
    };

    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(signal)
    .into_future();
    let mut server = std::pin::pin!(server);

    let fired_at = tokio::select! {
        served = &mut server => {
            served.context("server error")?;
            None
        }
        fired_at = &mut fired => Some(fired_at.unwrap_or_else(|_| Instant::now())),
    };
    let deadline = fired_at.unwrap_or_else(Instant::now) + budget;

    let mut report = ShutdownReport::default();
    if fired_at.is_some() {
        match tokio::time::timeout_at(deadline, &mut server).await {
            Ok(served) => served.context("server error")?,
            Err(_) => {
                warn!(?budget, "in-flight requests still running at shutdown deadline");
                report.requests_abandoned = true;
            }
        }
    }

    info!("completing background tasks");
    let remaining = deadline.saturating_duration_since(Instant::now());
    report.background = background.shutdown(remaining).await;
    Ok(report)
}
