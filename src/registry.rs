use crate::config::EngineConfig;
use crate::engine::{flatten_one, QueryCache, ResultEngine};
use crate::error::{ApiTrackError, Result};
use crate::store::DocumentStore;
use crate::types::{
    ApiDocument, DeleteOutcome, DeployOutcome, DeployRequest, DeploymentKey, EnvironmentPatch, Row,
    SearchOptions, SearchPage, StoreStats,
};
use std::sync::Arc;

/// Entry point tying the store, the engine and the query cache together.
///
/// Reads go through the cache. Every write that succeeds invalidates it, so
/// a search issued after a write returns never sees pre-write results.
pub struct DeploymentRegistry {
    store: Arc<dyn DocumentStore>,
    engine: ResultEngine,
    cache: Arc<QueryCache>,
}

impl DeploymentRegistry {
    pub fn new(store: Arc<dyn DocumentStore>, config: EngineConfig) -> Self {
        let cache = Arc::new(QueryCache::new(config.cache_ttl(), config.cache_capacity));
        Self::with_cache(store, config, cache)
    }

    /// Build with an externally owned cache.
    pub fn with_cache(
        store: Arc<dyn DocumentStore>,
        config: EngineConfig,
        cache: Arc<QueryCache>,
    ) -> Self {
        DeploymentRegistry {
            engine: ResultEngine::new(Arc::clone(&store), config),
            store,
            cache,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn engine(&self) -> &ResultEngine {
        &self.engine
    }

    /// Search with defaults filled in from the config. Results are served
    /// from the cache when possible; parse errors are never cached.
    pub fn search(
        &self,
        query: &str,
        page: Option<usize>,
        page_size: Option<usize>,
        options: SearchOptions,
    ) -> Result<Arc<SearchPage>> {
        let page = page.unwrap_or(1);
        let page_size = page_size.unwrap_or(self.config().default_page_size);
        self.engine.validate_pagination(page, page_size)?;

        let ast = self.engine.parse(query)?;
        let key = QueryCache::key(&ast, page, page_size, options);
        self.cache
            .get_or_compute(&key, || self.engine.execute(&ast, page, page_size, options))
    }

    /// Whole document for one API, every platform and environment included.
    pub fn get_api(&self, name: &str) -> Result<ApiDocument> {
        self.store
            .get_api(name)?
            .ok_or_else(|| ApiTrackError::ApiNotFound(name.trim().to_string()))
    }

    pub fn get_deployment(&self, key: &DeploymentKey) -> Result<Row> {
        let doc = self
            .store
            .get_api(&key.api_name)?
            .ok_or_else(|| key.not_found())?;
        flatten_one(&doc, key.platform, key.environment).ok_or_else(|| key.not_found())
    }

    pub fn suggest(&self, field: &str, prefix: &str, limit: Option<usize>) -> Result<Vec<String>> {
        self.engine.suggest(field, prefix, limit)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        self.engine.stats()
    }

    pub fn deploy(&self, request: &DeployRequest) -> Result<DeployOutcome> {
        let outcome = self.store.deploy(request)?;
        self.cache.invalidate_all();
        Ok(outcome)
    }

    pub fn update(&self, key: &DeploymentKey, patch: &EnvironmentPatch) -> Result<()> {
        self.store.update(key, patch)?;
        self.cache.invalidate_all();
        Ok(())
    }

    pub fn replace(&self, request: &DeployRequest) -> Result<()> {
        self.store.replace(request)?;
        self.cache.invalidate_all();
        Ok(())
    }

    pub fn delete(&self, key: &DeploymentKey) -> Result<DeleteOutcome> {
        let outcome = self.store.delete(key)?;
        self.cache.invalidate_all();
        Ok(outcome)
    }
}
