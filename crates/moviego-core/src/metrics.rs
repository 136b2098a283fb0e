//! Request counters exposed at `/debug/vars`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use serde::Serialize;
use tokio::time::Instant;

/// Process-wide request metrics. Construct one and share it through state.
#[derive(Debug, Default)]
pub struct Metrics {
    requests_received: AtomicU64,
    responses_sent: AtomicU64,
    processing_time_us: AtomicU64,
    by_status: Mutex<BTreeMap<u16, u64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests_received: u64,
    pub total_responses_sent: u64,
    pub total_processing_time_us: u64,
    pub total_responses_sent_by_status: BTreeMap<String, u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_response(&self, status: u16, elapsed_us: u64) {
        self.responses_sent.fetch_add(1, Ordering::Relaxed);
        self.processing_time_us.fetch_add(elapsed_us, Ordering::Relaxed);
        let mut by_status = self.by_status.lock().unwrap_or_else(PoisonError::into_inner);
        *by_status.entry(status).or_default() += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let by_status = self.by_status.lock().unwrap_or_else(PoisonError::into_inner);
        MetricsSnapshot {
            total_requests_received: self.requests_received.load(Ordering::Relaxed),
            total_responses_sent: self.responses_sent.load(Ordering::Relaxed),
            total_processing_time_us: self.processing_time_us.load(Ordering::Relaxed),
            total_responses_sent_by_status: by_status
                .iter()
                .map(|(code, n)| (code.to_string(), *n))
                .collect(),
        }
    }
}

pub async fn track_metrics(
    State(metrics): State<Arc<Metrics>>,
    req: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    metrics.record_request();
    let response = next.run(req).await;
    let elapsed = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    metrics.record_response(response.status().as_u16(), elapsed);
    response
}
