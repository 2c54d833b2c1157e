pub mod memory;

pub use memory::MemoryStore;

use crate::error::Result;
use crate::types::{
    ApiDocument, DeleteOutcome, DeployOutcome, DeployRequest, DeploymentKey, EnvironmentPatch,
};

/// Persistence boundary for API documents.
///
/// Implementations hand out owned snapshots, so readers never hold locks
/// while a query runs. Writes address one environment by
/// (api, platform, environment) and must be serialized per API name.
pub trait DocumentStore: Send + Sync {
    /// Every stored document. Order is unspecified.
    fn list_apis(&self) -> Result<Vec<ApiDocument>>;

    fn get_api(&self, name: &str) -> Result<Option<ApiDocument>>;

    /// Create or overwrite one environment. `deploymentDate` survives overwrites.
    fn deploy(&self, request: &DeployRequest) -> Result<DeployOutcome>;

    /// Partial update of an existing environment; properties are merged.
    fn update(&self, key: &DeploymentKey, patch: &EnvironmentPatch) -> Result<()>;

    /// Full overwrite of an existing environment.
    fn replace(&self, request: &DeployRequest) -> Result<()>;

    /// Remove one environment, cascading to empty platforms and APIs.
    fn delete(&self, key: &DeploymentKey) -> Result<DeleteOutcome>;
}
