use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use apitrack::error::ApiTrackError;
use apitrack::StoreStats;

use super::{parse_count, run_blocking, AppState};
use crate::dto::{DataResponse, SuggestionParams};

/// `GET /api/suggestions/:field?prefix=&limit=`
pub async fn suggestions(
    State(state): State<Arc<AppState>>,
    Path(field): Path<String>,
    Query(params): Query<SuggestionParams>,
) -> Result<Json<DataResponse<Vec<String>>>, ApiTrackError> {
    let limit = parse_count("limit", params.limit.as_deref())?;
    let registry = Arc::clone(&state.registry);
    let prefix = params.prefix.unwrap_or_default();
    let values = run_blocking(move || registry.suggest(&field, &prefix, limit)).await?;
    Ok(Json(DataResponse::success(values)))
}

/// `GET /api/stats`
pub async fn stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DataResponse<StoreStats>>, ApiTrackError> {
    let registry = Arc::clone(&state.registry);
    let stats = run_blocking(move || registry.stats()).await?;
    Ok(Json(DataResponse::success(stats)))
}
