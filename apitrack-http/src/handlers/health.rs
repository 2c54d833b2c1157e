use axum::{extract::State, Json};
use std::sync::Arc;

use super::AppState;
use crate::dto::HealthResponse;

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cache: state.registry.cache().stats(),
        persistence: state.snapshot.is_some(),
        build_profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
    })
}
