use apitrack::{
    CacheStats, DeleteOutcome, DeployOutcome, DeploymentStatus, Properties, Row, SearchPage,
};
use serde::{Deserialize, Serialize};

/// Raw search parameters. Numbers and flags stay strings here so malformed
/// input is reported through the JSON error body, not a plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub page_size: Option<String>,
    #[serde(default)]
    pub case_sensitive: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestionParams {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub status: &'static str,
    pub data: Vec<Row>,
    pub pagination: Pagination,
    pub truncated: bool,
}

impl From<&SearchPage> for SearchResponse {
    fn from(page: &SearchPage) -> Self {
        SearchResponse {
            status: "success",
            data: page.rows.clone(),
            pagination: Pagination {
                page: page.page,
                page_size: page.page_size,
                total: page.total,
                total_pages: page.total_pages,
            },
            truncated: page.truncated,
        }
    }
}

/// `{"status": "success", "data": ...}` envelope for single-payload responses.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub status: &'static str,
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn success(data: T) -> Self {
        DataResponse {
            status: "success",
            data,
        }
    }
}

/// Environment fields carried by PUT and PATCH bodies; the deployment itself
/// is addressed by the path.
#[derive(Debug, Default, Deserialize)]
pub struct EnvironmentBody {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub status: Option<DeploymentStatus>,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(default)]
    pub properties: Option<Properties>,
}

#[derive(Debug, Serialize)]
pub struct DeployResponse {
    pub status: &'static str,
    pub outcome: DeployOutcome,
    pub data: Row,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub status: &'static str,
    pub outcome: DeleteOutcome,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache: CacheStats,
    pub persistence: bool,
    pub build_profile: &'static str,
}

/// One member of a closed set: platform, environment or status.
#[derive(Debug, Serialize)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub display_name: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub status: &'static str,
    pub data: Vec<CatalogEntry>,
    pub count: usize,
}

impl CatalogResponse {
    pub fn new(data: Vec<CatalogEntry>) -> Self {
        CatalogResponse {
            status: "success",
            count: data.len(),
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchLimits {
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub case_sensitive: bool,
}

/// Everything a client needs to build a deploy form or a query UI.
#[derive(Debug, Serialize)]
pub struct ConfigData {
    pub platforms: Vec<CatalogEntry>,
    pub environments: Vec<CatalogEntry>,
    pub statuses: Vec<CatalogEntry>,
    pub search: SearchLimits,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub status: &'static str,
    pub valid: bool,
    pub message: &'static str,
}
