use axum::Json;
use axum::extract::State;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub environment: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub system_info: SystemInfo,
}

/// Handler for `GET /v1/healthcheck`.
pub async fn healthcheck(State(info): State<SystemInfo>) -> Json<Health> {
    Json(Health {
        status: "available",
        system_info: info,
    })
}
