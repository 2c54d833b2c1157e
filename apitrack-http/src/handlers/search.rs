use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;
use std::time::Instant;

use apitrack::error::ApiTrackError;
use apitrack::SearchOptions;

use super::{parse_count, parse_flag, run_blocking, AppState};
use crate::dto::{SearchParams, SearchResponse};

/// `GET /api/search?q=&page=&page_size=&case_sensitive=`
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiTrackError> {
    let start = Instant::now();
    let page_number = parse_count("page", params.page.as_deref())?;
    let page_size = parse_count("page_size", params.page_size.as_deref())?;
    let options = SearchOptions {
        case_sensitive: parse_flag("case_sensitive", params.case_sensitive.as_deref())?
            .unwrap_or(state.registry.config().case_sensitive),
    };
    let query = params.q.unwrap_or_default();

    let registry = Arc::clone(&state.registry);
    let log_query = query.clone();
    let page = run_blocking(move || registry.search(&query, page_number, page_size, options))
        .await
        .map_err(|e| {
            tracing::debug!("[SEARCH] rejected '{}': {}", log_query, e);
            e
        })?;

    tracing::info!(
        "[SEARCH] '{}' -> {} rows (page {}/{}) in {:?}",
        log_query,
        page.total,
        page.page,
        page.total_pages,
        start.elapsed()
    );
    Ok(Json(SearchResponse::from(page.as_ref())))
}
