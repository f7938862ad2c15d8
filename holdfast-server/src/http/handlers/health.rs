use axum::response::Json;
use serde_json::{json, Value};

pub async fn ping() -> &'static str {
    "pong"
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
