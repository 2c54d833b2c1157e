#![allow(dead_code)]

use apitrack::{
    ApiDocument, ApiTrackError, DeleteOutcome, DeployOutcome, DeployRequest, DeploymentKey,
    DeploymentRegistry, DeploymentStatus, DocumentStore, EngineConfig, EnvironmentId,
    EnvironmentPatch, MemoryStore, PlatformId, Result, SearchPage,
};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================
// Shared fixtures
// ============================================================

/// Seven deployments across four APIs:
///
/// | api                     | platform   | env | version | status    |
/// |-------------------------|------------|-----|---------|-----------|
/// | user-authentication-api | IP4        | prd | 2.1.0   | RUNNING   |
/// | user-authentication-api | IP4        | dev | 2.2.0   | DEPLOYING |
/// | user-authentication-api | AWS        | prd | 2.0.5   | RUNNING   |
/// | superuser-api           | IP4        | prd | 1.5.2   | STOPPED   |
/// | billing-service         | OpenShift  | stg | 3.0.1   | RUNNING   |
/// | billing-service         | Kubernetes | prd | 1.0.0   | FAILED    |
/// | orders-api              | Docker     | qa  | 0.9.0   | PENDING   |
pub fn deployments() -> Vec<DeployRequest> {
    vec![
        DeployRequest::new("user-authentication-api", PlatformId::Ip4, EnvironmentId::Prd)
            .with_version("2.1.0")
            .with_status(DeploymentStatus::Running)
            .with_updated_by("ci-bot")
            .with_property("owner", json!("team-platform")),
        DeployRequest::new("user-authentication-api", PlatformId::Ip4, EnvironmentId::Dev)
            .with_version("2.2.0")
            .with_status(DeploymentStatus::Deploying)
            .with_updated_by("ci-bot")
            .with_property("owner", json!("team-platform")),
        DeployRequest::new("user-authentication-api", PlatformId::Aws, EnvironmentId::Prd)
            .with_version("2.0.5")
            .with_status(DeploymentStatus::Running)
            .with_updated_by("ci-bot"),
        DeployRequest::new("superuser-api", PlatformId::Ip4, EnvironmentId::Prd)
            .with_version("1.5.2")
            .with_status(DeploymentStatus::Stopped)
            .with_updated_by("admin")
            .with_property("owner", json!("team-admin")),
        DeployRequest::new("billing-service", PlatformId::OpenShift, EnvironmentId::Stg)
            .with_version("3.0.1")
            .with_status(DeploymentStatus::Running)
            .with_updated_by("Jane Doe")
            .with_property("meta", json!({"region": "eu-west", "replicas": 3}))
            .with_property("tags", json!(["payments", "critical"])),
        DeployRequest::new("billing-service", PlatformId::Kubernetes, EnvironmentId::Prd)
            .with_version("1.0.0")
            .with_status(DeploymentStatus::Failed)
            .with_updated_by("Jane Doe")
            .with_property("replicas", json!(5)),
        DeployRequest::new("orders-api", PlatformId::Docker, EnvironmentId::Qa)
            .with_version("0.9.0")
            .with_status(DeploymentStatus::Pending)
            .with_updated_by("bob"),
    ]
}

pub fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for request in deployments() {
        store.deploy(&request).unwrap();
    }
    store
}

pub fn seeded_registry() -> DeploymentRegistry {
    DeploymentRegistry::new(seeded_store(), EngineConfig::default())
}

/// `api/platform/env` labels of a page, in result order.
pub fn labels(page: &SearchPage) -> Vec<String> {
    page.rows
        .iter()
        .map(|r| format!("{}/{}/{}", r.api_name, r.platform_id, r.environment_id))
        .collect()
}

// ============================================================
// A store whose reads can be made to fail
// ============================================================

/// Wraps a [`MemoryStore`], failing `list_apis` while `failing` is set and
/// counting how often it was read.
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub failing: AtomicBool,
    pub reads: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        FlakyStore {
            inner,
            failing: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl DocumentStore for FlakyStore {
    fn list_apis(&self) -> Result<Vec<ApiDocument>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ApiTrackError::Store("backend unavailable".to_string()));
        }
        self.inner.list_apis()
    }

    fn get_api(&self, name: &str) -> Result<Option<ApiDocument>> {
        self.inner.get_api(name)
    }

    fn deploy(&self, request: &DeployRequest) -> Result<DeployOutcome> {
        self.inner.deploy(request)
    }

    fn update(&self, key: &DeploymentKey, patch: &EnvironmentPatch) -> Result<()> {
        self.inner.update(key, patch)
    }

    fn replace(&self, request: &DeployRequest) -> Result<()> {
        self.inner.replace(request)
    }

    fn delete(&self, key: &DeploymentKey) -> Result<DeleteOutcome> {
        self.inner.delete(key)
    }
}
