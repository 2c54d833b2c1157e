use super::DocumentStore;
use crate::error::{ApiTrackError, Result};
use crate::types::{
    ApiDocument, DeleteOutcome, DeployOutcome, DeployRequest, DeploymentKey, Environment,
    EnvironmentId, EnvironmentPatch, Platform,
};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use indexmap::map::Entry as IndexEntry;
use std::path::Path;

/// In-process document store.
///
/// Documents live in a sharded map keyed by API name; every write goes
/// through the entry API, so writes to one API are serialized by its shard
/// lock while reads of other APIs proceed.
#[derive(Default)]
pub struct MemoryStore {
    docs: DashMap<String, ApiDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            docs: DashMap::new(),
        }
    }

    pub fn from_documents(docs: impl IntoIterator<Item = ApiDocument>) -> Self {
        let store = MemoryStore::new();
        for doc in docs {
            if doc.deployment_count() == 0 {
                tracing::warn!("[STORE] skipping '{}': no deployments", doc.name);
                continue;
            }
            if store.docs.insert(doc.name.clone(), doc).is_some() {
                tracing::warn!("[STORE] duplicate API name, keeping the later document");
            }
        }
        store
    }

    /// Load a snapshot written by [`MemoryStore::save`] (a JSON array of API
    /// documents in the stored shape). A missing file yields an empty store;
    /// malformed documents and entries are skipped.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("[STORE] {} not found, starting empty", path.display());
            return Ok(MemoryStore::new());
        }

        let raw = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        let items = value.as_array().ok_or_else(|| {
            ApiTrackError::Store(format!(
                "{}: expected a JSON array of API documents",
                path.display()
            ))
        })?;

        let docs = items.iter().filter_map(|item| match ApiDocument::from_json(item) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!("[STORE] skipping document in {}: {}", path.display(), e);
                None
            }
        });
        let store = MemoryStore::from_documents(docs);
        tracing::info!("[STORE] loaded {} APIs from {}", store.len(), path.display());
        Ok(store)
    }

    /// Write every document to `path`, replacing it atomically.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut docs = self.list_apis()?;
        docs.sort_by(|a, b| a.name.cmp(&b.name));
        let json = serde_json::Value::Array(docs.iter().map(ApiDocument::to_json).collect());

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, &json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path)
            .map_err(|e| ApiTrackError::Io(e.error.to_string()))?;

        tracing::debug!("[STORE] saved {} APIs to {}", docs.len(), path.display());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

fn platform_with(environment: EnvironmentId, env: Environment) -> Platform {
    let mut platform = Platform::default();
    platform.environments.insert(environment, env);
    platform
}

impl DocumentStore for MemoryStore {
    fn list_apis(&self) -> Result<Vec<ApiDocument>> {
        Ok(self.docs.iter().map(|entry| entry.value().clone()).collect())
    }

    fn get_api(&self, name: &str) -> Result<Option<ApiDocument>> {
        Ok(self.docs.get(name.trim()).map(|doc| doc.value().clone()))
    }

    fn deploy(&self, request: &DeployRequest) -> Result<DeployOutcome> {
        request.validate()?;
        let key = request.key();
        let now = Utc::now();
        let mut env = request.to_environment(now);

        let outcome = match self.docs.entry(key.api_name.clone()) {
            Entry::Vacant(vacant) => {
                let mut doc = ApiDocument::new(key.api_name.clone());
                doc.platforms
                    .insert(key.platform, platform_with(key.environment, env));
                vacant.insert(doc);
                DeployOutcome::Created
            }
            Entry::Occupied(mut occupied) => match occupied.get_mut().platforms.entry(key.platform) {
                IndexEntry::Vacant(vacant) => {
                    vacant.insert(platform_with(key.environment, env));
                    DeployOutcome::PlatformAdded
                }
                IndexEntry::Occupied(mut platform) => {
                    match platform.get_mut().environments.entry(key.environment) {
                        IndexEntry::Vacant(vacant) => {
                            vacant.insert(env);
                            DeployOutcome::EnvironmentAdded
                        }
                        IndexEntry::Occupied(mut existing) => {
                            env.deployment_date = existing.get().deployment_date.or(Some(now));
                            existing.insert(env);
                            DeployOutcome::Updated
                        }
                    }
                }
            },
        };

        tracing::info!("[STORE] deploy {} ({:?})", key, outcome);
        Ok(outcome)
    }

    fn update(&self, key: &DeploymentKey, patch: &EnvironmentPatch) -> Result<()> {
        patch.validate()?;
        let mut doc = self
            .docs
            .get_mut(key.api_name.trim())
            .ok_or_else(|| key.not_found())?;
        let env = doc
            .platforms
            .get_mut(&key.platform)
            .and_then(|p| p.environments.get_mut(&key.environment))
            .ok_or_else(|| key.not_found())?;

        if let Some(version) = &patch.version {
            env.version = version.clone();
        }
        if let Some(status) = patch.status {
            env.status = status;
        }
        if let Some(updated_by) = &patch.updated_by {
            env.updated_by = updated_by.clone();
        }
        if let Some(properties) = &patch.properties {
            for (k, v) in properties {
                env.properties.insert(k.clone(), v.clone());
            }
        }
        env.last_updated = Some(Utc::now());

        tracing::info!("[STORE] update {}", key);
        Ok(())
    }

    fn replace(&self, request: &DeployRequest) -> Result<()> {
        request.validate()?;
        let key = request.key();
        let mut doc = self
            .docs
            .get_mut(&key.api_name)
            .ok_or_else(|| key.not_found())?;
        let env = doc
            .platforms
            .get_mut(&key.platform)
            .and_then(|p| p.environments.get_mut(&key.environment))
            .ok_or_else(|| key.not_found())?;

        let mut replacement = request.to_environment(Utc::now());
        replacement.deployment_date = env.deployment_date.or(replacement.deployment_date);
        *env = replacement;

        tracing::info!("[STORE] replace {}", key);
        Ok(())
    }

    fn delete(&self, key: &DeploymentKey) -> Result<DeleteOutcome> {
        let Entry::Occupied(mut occupied) = self.docs.entry(key.api_name.trim().to_string()) else {
            return Err(key.not_found());
        };

        let doc = occupied.get_mut();
        let Some(platform) = doc.platforms.get_mut(&key.platform) else {
            return Err(key.not_found());
        };
        if platform.environments.shift_remove(&key.environment).is_none() {
            return Err(key.not_found());
        }

        let outcome = if !platform.environments.is_empty() {
            DeleteOutcome::EnvironmentRemoved
        } else {
            doc.platforms.shift_remove(&key.platform);
            if doc.platforms.is_empty() {
                occupied.remove();
                DeleteOutcome::ApiRemoved
            } else {
                DeleteOutcome::PlatformRemoved
            }
        };

        tracing::info!("[STORE] delete {} ({:?})", key, outcome);
        Ok(outcome)
    }
}
