/// Write path: lifecycle, cascading deletes, validation and snapshots.
mod common;

use apitrack::{
    ApiTrackError, DeleteOutcome, DeployOutcome, DeployRequest, DeploymentKey,
    DeploymentRegistry, DocumentStore, EngineConfig, EnvironmentId, EnvironmentPatch,
    MemoryStore, PlatformId, SearchOptions,
};
use common::{seeded_store, deployments};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_cascading_delete_removes_platform_and_api() {
    let store = seeded_store();
    let registry = DeploymentRegistry::new(store.clone(), EngineConfig::default());

    assert_eq!(
        registry
            .delete(&DeploymentKey::new("billing-service", PlatformId::Kubernetes, EnvironmentId::Prd))
            .unwrap(),
        DeleteOutcome::PlatformRemoved
    );
    let doc = store.get_api("billing-service").unwrap().unwrap();
    assert!(!doc.platforms.contains_key(&PlatformId::Kubernetes));

    assert_eq!(
        registry
            .delete(&DeploymentKey::new("billing-service", PlatformId::OpenShift, EnvironmentId::Stg))
            .unwrap(),
        DeleteOutcome::ApiRemoved
    );
    assert!(store.get_api("billing-service").unwrap().is_none());
    assert_eq!(registry.stats().unwrap().total_apis, 3);
    assert_eq!(
        registry
            .search("billing", None, None, SearchOptions::default())
            .unwrap()
            .total,
        0
    );
}

#[test]
fn test_deleting_missing_entries() {
    let registry = DeploymentRegistry::new(seeded_store(), EngineConfig::default());
    let err = registry
        .delete(&DeploymentKey::new("orders-api", PlatformId::Docker, EnvironmentId::Prd))
        .unwrap_err();
    assert!(matches!(err, ApiTrackError::DeploymentNotFound { .. }));
    assert_eq!(err.status_code(), http::StatusCode::NOT_FOUND);
}

#[test]
fn test_stats() {
    let registry = DeploymentRegistry::new(seeded_store(), EngineConfig::default());
    let stats = registry.stats().unwrap();
    assert_eq!(stats.total_apis, 4);
    assert_eq!(stats.total_platforms, 6);
    assert_eq!(stats.total_deployments, 7);
}

#[test]
fn test_validation_rejects_oversized_input() {
    let registry = DeploymentRegistry::new(Arc::new(MemoryStore::new()), EngineConfig::default());
    let too_long = DeployRequest::new("x".repeat(256), PlatformId::Ip4, EnvironmentId::Prd);
    assert!(matches!(
        registry.deploy(&too_long),
        Err(ApiTrackError::InvalidDeployment(_))
    ));

    let mut many = DeployRequest::new("svc", PlatformId::Ip4, EnvironmentId::Prd);
    for i in 0..101 {
        many = many.with_property(format!("k{}", i), json!(i));
    }
    assert!(registry.deploy(&many).is_err());

    let long_author = DeployRequest::new("svc", PlatformId::Ip4, EnvironmentId::Prd)
        .with_updated_by("a".repeat(101));
    assert!(registry.deploy(&long_author).is_err());
    assert_eq!(registry.stats().unwrap().total_apis, 0);
}

#[test]
fn test_patch_requires_a_change() {
    let registry = DeploymentRegistry::new(seeded_store(), EngineConfig::default());
    let key = DeploymentKey::new("orders-api", PlatformId::Docker, EnvironmentId::Qa);
    assert!(registry.update(&key, &EnvironmentPatch::default()).is_err());
    registry
        .update(
            &key,
            &EnvironmentPatch {
                version: Some("1.0.0".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(registry.get_deployment(&key).unwrap().version, "1.0.0");
}

#[test]
fn test_api_names_are_trimmed() {
    let store = MemoryStore::new();
    assert_eq!(
        store
            .deploy(&DeployRequest::new("  padded-api ", PlatformId::Ip4, EnvironmentId::Dev))
            .unwrap(),
        DeployOutcome::Created
    );
    assert!(store.get_api("padded-api").unwrap().is_some());
}

#[test]
fn test_snapshot_round_trip_through_registry() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("apis.json");

    let store = MemoryStore::new();
    for request in deployments() {
        store.deploy(&request).unwrap();
    }
    store.save(&path).unwrap();

    let reloaded = Arc::new(MemoryStore::load(&path).unwrap());
    let registry = DeploymentRegistry::new(reloaded, EngineConfig::default());
    let opts = SearchOptions::default();
    assert_eq!(registry.search("", None, None, opts).unwrap().total, 7);
    assert_eq!(
        registry
            .search("Properties : meta.region = eu-west", None, None, opts)
            .unwrap()
            .total,
        1
    );
}
