use axum::{extract::State, Json};
use std::sync::Arc;

use apitrack::{DeploymentStatus, EnvironmentId, PlatformId};

use super::AppState;
use crate::dto::{CatalogEntry, CatalogResponse, ConfigData, DataResponse, SearchLimits};

macro_rules! catalog {
    ($set:ty) => {
        <$set>::ALL
            .iter()
            .map(|v| CatalogEntry {
                id: v.as_str(),
                name: v.display_name(),
                display_name: v.display_name(),
            })
            .collect::<Vec<_>>()
    };
}

/// `GET /api/platforms`
pub async fn platforms() -> Json<CatalogResponse> {
    Json(CatalogResponse::new(catalog!(PlatformId)))
}

/// `GET /api/environments`
pub async fn environments() -> Json<CatalogResponse> {
    Json(CatalogResponse::new(catalog!(EnvironmentId)))
}

/// `GET /api/statuses`
pub async fn statuses() -> Json<CatalogResponse> {
    Json(CatalogResponse::new(catalog!(DeploymentStatus)))
}

/// `GET /api/config`: the three catalogs plus the search limits in effect.
pub async fn config(State(state): State<Arc<AppState>>) -> Json<DataResponse<ConfigData>> {
    let engine = state.registry.config();
    Json(DataResponse::success(ConfigData {
        platforms: catalog!(PlatformId),
        environments: catalog!(EnvironmentId),
        statuses: catalog!(DeploymentStatus),
        search: SearchLimits {
            default_page_size: engine.default_page_size,
            max_page_size: engine.max_page_size,
            case_sensitive: engine.case_sensitive,
        },
        version: env!("CARGO_PKG_VERSION"),
    }))
}
