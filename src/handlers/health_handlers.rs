//! Process liveness for load balancers and orchestrators.

use axum::{Json, response::IntoResponse};
use serde::Serialize;

#[derive(Serialize)]
struct Liveness {
    status: &'static str,
}

/// `GET /healthz`: answers `{"status":"ok"}` while the process is serving.
/// Bucket reachability is not probed.
pub async fn healthz() -> impl IntoResponse {
    Json(Liveness { status: "ok" })
}
