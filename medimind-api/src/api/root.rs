//! Service banner

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "MediMind Backend API is running",
        "version": "1.0.0",
        "endpoints": {
            "auth": "/auth",
            "prescriptions": "/api",
            "health": "/health",
        },
    }))
}

pub fn root_routes() -> Router<AppState> {
    Router::new().route("/", get(root))
}
