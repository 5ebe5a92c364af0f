use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Liveness probe; does not touch the models or the camera.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
