use crate::error::Result;
use crate::types::{ApiDocument, EnvironmentId, PlatformId, Row};

/// Expand a document into one row per (platform, environment) pair, in
/// document order. A document without platforms yields no rows.
pub fn flatten(doc: &ApiDocument) -> Vec<Row> {
    let mut rows = Vec::with_capacity(doc.deployment_count());
    for (platform_id, platform) in &doc.platforms {
        for environment_id in platform.environments.keys() {
            if let Some(row) = flatten_one(doc, *platform_id, *environment_id) {
                rows.push(row);
            }
        }
    }
    rows
}

/// Flatten a document in the raw stored shape, skipping malformed entries.
pub fn flatten_json(raw: &serde_json::Value) -> Result<Vec<Row>> {
    let doc = ApiDocument::from_json(raw)?;
    Ok(flatten(&doc))
}

/// The row for a single deployment, if it exists.
pub fn flatten_one(doc: &ApiDocument, platform: PlatformId, environment: EnvironmentId) -> Option<Row> {
    let env = doc.environment(platform, environment)?;
    Some(Row {
        api_name: doc.name.clone(),
        platform_id: platform,
        environment_id: environment,
        version: env.version.clone(),
        status: env.status,
        deployment_date: env.deployment_date,
        last_updated: env.last_updated,
        updated_by: env.updated_by.clone(),
        properties: env.properties.clone(),
    })
}
