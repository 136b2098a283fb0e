//! Per-client token buckets keyed by IP address.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    /// Sustained refill rate, tokens per second.
    pub rps: f64,
    /// Bucket capacity.
    pub burst: u32,
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rps: 2.0,
            burst: 4,
            enabled: true,
        }
    }
}

#[derive(Debug)]
struct TokenBucket {
    rate: f64,
    capacity: f64,
    tokens: f64,
    refilled_at: Instant,
}

impl TokenBucket {
    fn full(rate: f64, capacity: f64, now: Instant) -> Self {
        Self {
            rate,
            capacity,
            tokens: capacity,
            refilled_at: now,
        }
    }

    fn try_take(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.refilled_at).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.refilled_at = now;
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[derive(Debug)]
struct Client {
    bucket: TokenBucket,
    last_seen: Instant,
}

/// Registry of client buckets. One lock guards the whole map and is never held across an await.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    clients: Mutex<HashMap<IpAddr, Client>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<IpAddr, Client>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take one token for `addr`, creating its bucket on first sight.
    pub fn allow(&self, addr: IpAddr) -> bool {
        self.allow_at(addr, Instant::now())
    }

    pub fn allow_at(&self, addr: IpAddr, now: Instant) -> bool {
        let mut clients = self.clients();
        let client = clients.entry(addr).or_insert_with(|| Client {
            bucket: TokenBucket::full(self.config.rps, f64::from(self.config.burst), now),
            last_seen: now,
        });
        client.last_seen = now;
        client.bucket.try_take(now)
    }

    /// Drop clients not seen for longer than `idle`. Returns how many were evicted.
    pub fn sweep(&self, idle: Duration) -> usize {
        self.sweep_at(Instant::now(), idle)
    }

    pub fn sweep_at(&self, now: Instant, idle: Duration) -> usize {
        let mut clients = self.clients();
        let before = clients.len();
        clients.retain(|_, c| now.saturating_duration_since(c.last_seen) <= idle);
        before - clients.len()
    }

    pub fn len(&self) -> usize {
        self.clients().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run [`RateLimiter::sweep`] every `every` until the handle is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration, idle: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            loop {
                ticker.tick().await;
                let evicted = limiter.sweep(idle);
                if evicted > 0 {
                    tracing::debug!(evicted, remaining = limiter.len(), "rate limiter sweep");
                }
            }
        })
    }
}

/// Reject clients that have exhausted their bucket with 429.
///
/// Needs `ConnectInfo<SocketAddr>` on the request, which `axum::serve` provides
/// through `into_make_service_with_connect_info`.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    if !limiter.enabled() {
        return next.run(req).await;
    }
    let Some(ConnectInfo(peer)) = req.extensions().get::<ConnectInfo<SocketAddr>>().copied()
    else {
        return AppError::Internal(anyhow::anyhow!("client address missing from request"))
            .into_response();
    };
    if !limiter.allow(peer.ip()) {
        return AppError::RateLimited.into_response();
    }
    next.run(req).await
}
