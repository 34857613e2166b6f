use axum::{Json, Router, routing::get};

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub data: HealthData,
}

#[derive(serde::Serialize)]
pub struct HealthData {
    pub status: String,
}

pub fn router<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new().route("/healthz", get(healthz))
}

pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        data: HealthData {
            status: "ok".to_string(),
        },
    })
}
