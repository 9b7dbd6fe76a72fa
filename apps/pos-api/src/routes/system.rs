//! # System Routes
//!
//! Health-style reads; the only endpoints that skip the session layer.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use aurum_db::Database;

pub fn router() -> Router<Database> {
    Router::new().route("/health", get(health))
}

async fn health(State(db): State<Database>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "database": db.health_check().await,
    }))
}
