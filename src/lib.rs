//! # apitrack
//!
//! Tracks which version of which API is deployed to which platform and
//! environment, and answers questions about it through a small, typo-tolerant
//! query language.
//!
//! Each API is stored as one document owning its platforms, each platform
//! owning its environments. Queries run against the flattened view: one
//! [`Row`] per (API, platform, environment).
//!
//! ## Quick start
//!
//! ```rust
//! use apitrack::{
//!     DeployRequest, DeploymentRegistry, DeploymentStatus, EngineConfig, EnvironmentId,
//!     MemoryStore, PlatformId, SearchOptions,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> apitrack::Result<()> {
//! let registry = DeploymentRegistry::new(Arc::new(MemoryStore::new()), EngineConfig::default());
//!
//! registry.deploy(
//!     &DeployRequest::new("user-authentication-api", PlatformId::Ip4, EnvironmentId::Prd)
//!         .with_version("2.1.0")
//!         .with_status(DeploymentStatus::Running),
//! )?;
//!
//! // Field names tolerate typos and aliases; enum values ignore case
//! let page = registry.search("Platfrom = ip4 AND env = PRD", None, None, SearchOptions::default())?;
//! assert_eq!(page.total, 1);
//! assert_eq!(page.rows[0].version, "2.1.0");
//! # Ok(())
//! # }
//! ```
//!
//! ## Query language
//!
//! | Form | Example |
//! |------|---------|
//! | free text (whole words over name/platform/env) | `user prd` |
//! | comparison | `Version >= 2.0`, `Status != STOPPED`, `apiName contains auth` |
//! | property | `Properties : owner = team-platform`, `Properties : meta.region = eu` |
//! | conjunction / disjunction | `A AND B AND C`, `A OR B` (not mixed) |
//!
//! ## Feature flags
//!
//! | Feature | Dependencies | Use case |
//! |---------|-------------|----------|
//! | `axum-support` | axum | [`ApiTrackError`] implements `IntoResponse` |

pub mod config;
pub mod engine;
pub mod error;
pub mod query;
pub mod registry;
pub mod store;
pub mod types;

pub use config::EngineConfig;
pub use engine::{CacheStats, QueryCache, ResultEngine};
pub use error::{ApiTrackError, ParseError, ParseErrorKind, Result};
pub use query::{QueryNode, QueryParser};
pub use registry::DeploymentRegistry;
pub use store::{DocumentStore, MemoryStore};
pub use types::*;
