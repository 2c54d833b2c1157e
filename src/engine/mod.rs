//! Query evaluation over the document store.
//!
//! [`ResultEngine`] is stateless apart from its configuration: every search
//! takes a fresh snapshot of the store, flattens it, filters with a compiled
//! predicate, then sorts and pages the result.

pub mod cache;
pub mod flatten;

pub use cache::{CacheStats, QueryCache};
pub use flatten::{flatten, flatten_json, flatten_one};

use crate::config::EngineConfig;
use crate::error::{ApiTrackError, Result};
use crate::query::{Field, PipelineCompiler, QueryNode, QueryParser};
use crate::store::DocumentStore;
use crate::types::{ApiDocument, Row, SearchOptions, SearchPage, StoreStats};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;

pub struct ResultEngine {
    store: Arc<dyn DocumentStore>,
    parser: QueryParser,
    config: EngineConfig,
}

impl ResultEngine {
    pub fn new(store: Arc<dyn DocumentStore>, config: EngineConfig) -> Self {
        ResultEngine {
            store,
            parser: QueryParser::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn parse(&self, query: &str) -> Result<QueryNode> {
        Ok(self.parser.parse(query)?)
    }

    /// `page` is 1-based; `page_size` must be within `1..=max_page_size`.
    pub fn validate_pagination(&self, page: usize, page_size: usize) -> Result<()> {
        if page == 0 {
            return Err(ApiTrackError::InvalidPagination(
                "page must be at least 1".to_string(),
            ));
        }
        if page_size == 0 || page_size > self.config.max_page_size {
            return Err(ApiTrackError::InvalidPagination(format!(
                "page_size must be between 1 and {} (got {})",
                self.config.max_page_size, page_size
            )));
        }
        Ok(())
    }

    /// Parse and run `query`, returning one page of rows.
    pub fn search(
        &self,
        query: &str,
        page: usize,
        page_size: usize,
        options: SearchOptions,
    ) -> Result<SearchPage> {
        self.validate_pagination(page, page_size)?;
        let ast = self.parse(query)?;
        self.execute(&ast, page, page_size, options)
    }

    /// Run an already parsed query.
    pub fn execute(
        &self,
        ast: &QueryNode,
        page: usize,
        page_size: usize,
        options: SearchOptions,
    ) -> Result<SearchPage> {
        self.validate_pagination(page, page_size)?;
        let start = Instant::now();
        let predicate = PipelineCompiler::new(options).compile(ast)?;
        let (docs, truncated) = self.scan()?;

        let mut rows: Vec<Row> = docs
            .iter()
            .flat_map(flatten)
            .filter(|row| predicate(row))
            .collect();
        rows.sort_by(|a, b| {
            a.api_name
                .cmp(&b.api_name)
                .then_with(|| a.platform_id.as_str().cmp(b.platform_id.as_str()))
                .then_with(|| a.environment_id.as_str().cmp(b.environment_id.as_str()))
        });

        let total = rows.len();
        let total_pages = total.div_ceil(page_size);
        let offset = (page - 1).saturating_mul(page_size);
        let rows: Vec<Row> = rows.into_iter().skip(offset).take(page_size).collect();

        tracing::debug!(
            "[SEARCH] '{}' page={} size={} total={} returned={} in {:?}",
            ast,
            page,
            page_size,
            total,
            rows.len(),
            start.elapsed()
        );

        Ok(SearchPage {
            rows,
            total,
            total_pages,
            page,
            page_size,
            truncated,
        })
    }

    /// Distinct values of `field` starting with `prefix` (case-insensitive),
    /// sorted, at most `limit` of them.
    pub fn suggest(&self, field: &str, prefix: &str, limit: Option<usize>) -> Result<Vec<String>> {
        let field = self.parser.resolver().resolve(field)?;
        if field == Field::Properties {
            return Err(ApiTrackError::InvalidQuery(
                "Properties values cannot be suggested; query a property key instead".to_string(),
            ));
        }
        let limit = limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT);
        let prefix = prefix.trim().to_lowercase();

        let (docs, _) = self.scan()?;
        let values: BTreeSet<String> = docs
            .iter()
            .flat_map(flatten)
            .filter_map(|row| field_text(&row, field))
            .filter(|value| !value.is_empty() && value.to_lowercase().starts_with(&prefix))
            .collect();

        Ok(values.into_iter().take(limit).collect())
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let docs = self.store.list_apis()?;
        Ok(StoreStats {
            total_apis: docs.len(),
            total_platforms: docs.iter().map(|d| d.platforms.len()).sum(),
            total_deployments: docs.iter().map(ApiDocument::deployment_count).sum(),
        })
    }

    /// Snapshot of the store in name order, capped at `max_scan_documents`.
    fn scan(&self) -> Result<(Vec<ApiDocument>, bool)> {
        let mut docs = self.store.list_apis()?;
        docs.sort_by(|a, b| a.name.cmp(&b.name));
        let cap = self.config.max_scan_documents;
        let truncated = docs.len() > cap;
        if truncated {
            tracing::warn!(
                "[SEARCH] scan capped at {} of {} documents; results are partial",
                cap,
                docs.len()
            );
            docs.truncate(cap);
        }
        Ok((docs, truncated))
    }
}

fn field_text(row: &Row, field: Field) -> Option<String> {
    match field {
        Field::ApiName => Some(row.api_name.clone()),
        Field::PlatformId => Some(row.platform_id.to_string()),
        Field::EnvironmentId => Some(row.environment_id.to_string()),
        Field::Version => Some(row.version.clone()),
        Field::Status => Some(row.status.to_string()),
        Field::UpdatedBy => Some(row.updated_by.clone()),
        Field::LastUpdated => row.last_updated.map(|t| t.to_rfc3339()),
        Field::DeploymentDate => row.deployment_date.map(|t| t.to_rfc3339()),
        Field::Properties => None,
    }
}
