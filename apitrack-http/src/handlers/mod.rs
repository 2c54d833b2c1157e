use apitrack::{ApiTrackError, DeploymentKey, DeploymentRegistry, MemoryStore, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub mod catalog;
pub mod deploy;
pub mod health;
pub mod search;
pub mod suggestions;

pub struct AppState {
    pub registry: Arc<DeploymentRegistry>,
    pub snapshot: Option<Snapshot>,
}

impl AppState {
    pub fn new(registry: Arc<DeploymentRegistry>) -> Self {
        AppState {
            registry,
            snapshot: None,
        }
    }

    pub fn with_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Write the store to its data file, if one is configured.
    pub(crate) fn persist(&self) -> Result<()> {
        match &self.snapshot {
            Some(snapshot) => snapshot.save(),
            None => Ok(()),
        }
    }
}

/// Data file the in-memory store is written back to after each write.
pub struct Snapshot {
    store: Arc<MemoryStore>,
    path: PathBuf,
    // Serializes saves so an older state never lands after a newer one
    lock: Mutex<()>,
}

impl Snapshot {
    pub fn new(store: Arc<MemoryStore>, path: impl Into<PathBuf>) -> Self {
        Snapshot {
            store,
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.store.save(&self.path)
    }
}

/// Run engine or store work off the async runtime.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiTrackError::Store(format!("spawn_blocking join error: {}", e)))?
}

/// Parse an optional positive-integer query parameter (`page`, `page_size`, `limit`).
pub(crate) fn parse_count(name: &str, raw: Option<&str>) -> Result<Option<usize>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(text) => text.parse::<usize>().map(Some).map_err(|_| {
            ApiTrackError::InvalidPagination(format!(
                "{} must be a non-negative integer, got '{}'",
                name, text
            ))
        }),
    }
}

/// Parse an optional boolean query parameter.
pub(crate) fn parse_flag(name: &str, raw: Option<&str>) -> Result<Option<bool>> {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => Ok(None),
        Some("true") | Some("1") => Ok(Some(true)),
        Some("false") | Some("0") => Ok(Some(false)),
        Some(other) => Err(ApiTrackError::InvalidQuery(format!(
            "{} must be true or false, got '{}'",
            name, other
        ))),
    }
}

/// Build a key from path segments; platform and environment parse case-insensitively.
pub(crate) fn deployment_key(api: &str, platform: &str, environment: &str) -> Result<DeploymentKey> {
    Ok(DeploymentKey::new(
        api,
        platform.parse()?,
        environment.parse()?,
    ))
}

pub use catalog::{config, environments, platforms, statuses};
pub use deploy::{
    delete_deployment, deploy, get_api, get_deployment, patch_deployment, put_deployment,
    validate_deployment,
};
pub use health::health;
pub use search::search;
pub use suggestions::{stats, suggestions};
