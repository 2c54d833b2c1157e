use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::handlers::{
    config, delete_deployment, deploy, environments, get_api, get_deployment, health,
    patch_deployment, platforms, put_deployment, search, stats, statuses, suggestions,
    validate_deployment, AppState, Snapshot,
};
use apitrack::{DeploymentRegistry, EngineConfig, MemoryStore};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/search", get(search))
        .route("/api/suggestions/:field", get(suggestions))
        .route("/api/stats", get(stats))
        .route("/api/platforms", get(platforms))
        .route("/api/environments", get(environments))
        .route("/api/statuses", get(statuses))
        .route("/api/config", get(config))
        .route("/api/deploy", post(deploy))
        .route("/api/deploy/validate", post(validate_deployment))
        .route("/api/apis/:api", get(get_api))
        .route(
            "/api/apis/:api/platforms/:platform/environments/:env",
            get(get_deployment)
                .put(put_deployment)
                .patch(patch_deployment)
                .delete(delete_deployment),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive().max_age(Duration::from_secs(86400)))
}

pub async fn serve() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::from_env();
    config.validate()?;
    tracing::info!(
        default_page_size = config.default_page_size,
        max_page_size = config.max_page_size,
        cache_ttl_secs = config.cache_ttl_secs,
        cache_capacity = config.cache_capacity,
        max_scan_documents = config.max_scan_documents,
        "Engine configuration loaded"
    );

    let bind_addr =
        std::env::var("APITRACK_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".to_string());
    let data_file = std::env::var("APITRACK_DATA_FILE")
        .ok()
        .filter(|p| !p.is_empty());

    let store = Arc::new(match &data_file {
        Some(path) => MemoryStore::load(path)?,
        None => MemoryStore::new(),
    });
    let registry = Arc::new(DeploymentRegistry::new(store.clone(), config));

    let mut state = AppState::new(registry);
    match data_file {
        Some(path) => {
            tracing::info!("[STORE] persisting to {}", path);
            state = state.with_snapshot(Snapshot::new(store, path));
        }
        None => {
            tracing::warn!("No APITRACK_DATA_FILE set; deployments are kept in memory only");
        }
    }

    let app = router(Arc::new(state));

    tracing::info!("Starting apitrack server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
