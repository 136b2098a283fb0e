use std::sync::Arc;

use axum::Json;
use axum::extract::State;

use moviego_core::envelope::Envelope;
use moviego_core::metrics::{Metrics, MetricsSnapshot};

// ── GET /debug/vars ───────────────────────────────────────────────────────────

pub async fn debug_vars(State(metrics): State<Arc<Metrics>>) -> Json<Envelope<MetricsSnapshot>> {
    Json(Envelope::new("metrics", metrics.snapshot()))
}
