use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

/// Liveness probe.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Creates a router containing the routes shared by every deployment.
pub fn routes() -> Router {
    Router::new().route("/health", get(health_handler))
}
