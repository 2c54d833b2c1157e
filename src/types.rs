use crate::error::{ApiTrackError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Free-form metadata attached to an environment. Never absent; may be empty.
pub type Properties = serde_json::Map<String, serde_json::Value>;

pub const MAX_API_NAME_LENGTH: usize = 255;
pub const MAX_UPDATED_BY_LENGTH: usize = 100;
pub const MAX_PROPERTIES_PER_DEPLOYMENT: usize = 100;
pub const MAX_PROPERTY_KEY_LENGTH: usize = 100;
pub const MAX_PROPERTY_VALUE_LENGTH: usize = 1000;

macro_rules! closed_set {
    (
        $(#[$meta:meta])*
        $name:ident, $what:literal {
            $($variant:ident => ($text:literal, $display:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String")]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Human-readable label, for catalogs and UIs.
            pub fn display_name(&self) -> &'static str {
                match self {
                    $($name::$variant => $display),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ApiTrackError;

            fn from_str(s: &str) -> Result<Self> {
                let trimmed = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(trimmed))
                    .ok_or_else(|| {
                        let valid: Vec<&str> = $name::ALL.iter().map(|v| v.as_str()).collect();
                        ApiTrackError::InvalidDeployment(format!(
                            "Invalid {} '{}'. Must be one of: {}",
                            $what,
                            s,
                            valid.join(", ")
                        ))
                    })
            }
        }

        impl TryFrom<String> for $name {
            type Error = ApiTrackError;

            fn try_from(s: String) -> Result<Self> {
                s.parse()
            }
        }
    };
}

closed_set! {
    /// Deployment target class.
    PlatformId, "Platform ID" {
        Ip4 => ("IP4", "IP4 Platform"),
        OpenShift => ("OpenShift", "OpenShift"),
        Kubernetes => ("Kubernetes", "Kubernetes"),
        Docker => ("Docker", "Docker"),
        Aws => ("AWS", "Amazon Web Services"),
        Azure => ("Azure", "Microsoft Azure"),
        Gcp => ("GCP", "Google Cloud Platform"),
    }
}

closed_set! {
    /// Deployment stage.
    EnvironmentId, "Environment ID" {
        Dev => ("dev", "Development"),
        Tst => ("tst", "Test"),
        Stg => ("stg", "Staging"),
        Prd => ("prd", "Production"),
        Dr => ("dr", "Disaster Recovery"),
        Uat => ("uat", "User Acceptance Testing"),
        Qa => ("qa", "Quality Assurance"),
    }
}

closed_set! {
    DeploymentStatus, "status" {
        Running => ("RUNNING", "RUNNING"),
        Stopped => ("STOPPED", "STOPPED"),
        Pending => ("PENDING", "PENDING"),
        Failed => ("FAILED", "FAILED"),
        Deploying => ("DEPLOYING", "DEPLOYING"),
        Deployed => ("DEPLOYED", "DEPLOYED"),
        Unknown => ("UNKNOWN", "UNKNOWN"),
        Error => ("ERROR", "ERROR"),
        Maintenance => ("MAINTENANCE", "MAINTENANCE"),
    }
}

impl Default for DeploymentStatus {
    fn default() -> Self {
        DeploymentStatus::Unknown
    }
}

/// One deployment stage of an API on a platform.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Environment {
    pub version: String,
    pub status: DeploymentStatus,
    /// Set on first deploy, preserved by later updates.
    pub deployment_date: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub updated_by: String,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Platform {
    pub environments: IndexMap<EnvironmentId, Environment>,
}

/// The per-API record: platforms keyed by ID, each owning its environments
/// keyed by ID. Insertion order is preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiDocument {
    pub name: String,
    pub platforms: IndexMap<PlatformId, Platform>,
}

impl ApiDocument {
    pub fn new(name: impl Into<String>) -> Self {
        ApiDocument {
            name: name.into(),
            platforms: IndexMap::new(),
        }
    }

    /// Number of (platform, environment) pairs, i.e. rows this document flattens to.
    pub fn deployment_count(&self) -> usize {
        self.platforms.values().map(|p| p.environments.len()).sum()
    }

    pub fn environment(&self, platform: PlatformId, environment: EnvironmentId) -> Option<&Environment> {
        self.platforms
            .get(&platform)
            .and_then(|p| p.environments.get(&environment))
    }

    /// Parse a document from the raw store shape
    /// (`{"API Name": .., "Platform": [{"PlatformID": .., "Environment": [..]}]}`).
    ///
    /// Malformed platform or environment entries are skipped with a warning so
    /// that one bad entry never hides the rest of the document.
    ///
    /// # Errors
    ///
    /// Returns [`ApiTrackError::InvalidDeployment`] if the value is not an
    /// object or has no usable API name.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let obj = json
            .as_object()
            .ok_or_else(|| ApiTrackError::InvalidDeployment("Expected JSON object".to_string()))?;

        // Accept both the stored key and the snake_case variant
        let name = obj
            .get("API Name")
            .or_else(|| obj.get("api_name"))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiTrackError::InvalidDeployment("Missing 'API Name'".to_string()))?
            .to_string();

        let mut doc = ApiDocument::new(name);
        let platforms = obj
            .get("Platform")
            .and_then(|v| v.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();

        for raw_platform in platforms {
            let Some(platform_obj) = raw_platform.as_object() else {
                tracing::warn!("[FLATTEN] {}: skipping non-object platform entry", doc.name);
                continue;
            };
            let platform_id = match platform_obj
                .get("PlatformID")
                .and_then(|v| v.as_str())
                .map(PlatformId::from_str)
            {
                Some(Ok(id)) => id,
                Some(Err(e)) => {
                    tracing::warn!("[FLATTEN] {}: skipping platform ({})", doc.name, e);
                    continue;
                }
                None => {
                    tracing::warn!("[FLATTEN] {}: skipping platform without PlatformID", doc.name);
                    continue;
                }
            };

            let raw_envs = platform_obj
                .get("Environment")
                .and_then(|v| v.as_array())
                .map(Vec::as_slice)
                .unwrap_or_default();
            let platform = doc.platforms.entry(platform_id).or_default();
            for raw_env in raw_envs {
                match environment_from_json(raw_env) {
                    Some((env_id, env)) => {
                        platform.environments.insert(env_id, env);
                    }
                    None => {
                        tracing::warn!(
                            "[FLATTEN] {}/{}: skipping malformed environment entry",
                            doc.name,
                            platform_id
                        );
                    }
                }
            }
            if platform.environments.is_empty() {
                doc.platforms.shift_remove(&platform_id);
            }
        }

        Ok(doc)
    }

    /// Inverse of [`ApiDocument::from_json`].
    pub fn to_json(&self) -> serde_json::Value {
        let platforms: Vec<serde_json::Value> = self
            .platforms
            .iter()
            .map(|(platform_id, platform)| {
                let envs: Vec<serde_json::Value> = platform
                    .environments
                    .iter()
                    .map(|(env_id, env)| {
                        serde_json::json!({
                            "environmentID": env_id.as_str(),
                            "version": env.version,
                            "status": env.status.as_str(),
                            "deploymentDate": env.deployment_date.map(|d| d.to_rfc3339()),
                            "lastUpdated": env.last_updated.map(|d| d.to_rfc3339()),
                            "updatedBy": env.updated_by,
                            "Properties": env.properties,
                        })
                    })
                    .collect();
                serde_json::json!({
                    "PlatformID": platform_id.as_str(),
                    "Environment": envs,
                })
            })
            .collect();

        serde_json::json!({
            "API Name": self.name,
            "Platform": platforms,
        })
    }
}

fn environment_from_json(raw: &serde_json::Value) -> Option<(EnvironmentId, Environment)> {
    let obj = raw.as_object()?;
    let env_id: EnvironmentId = obj.get("environmentID")?.as_str()?.parse().ok()?;

    let text = |key: &str| {
        obj.get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };
    let status = obj
        .get("status")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or_default();
    let properties = obj
        .get("Properties")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();

    Some((
        env_id,
        Environment {
            version: text("version"),
            status,
            deployment_date: obj.get("deploymentDate").and_then(parse_timestamp_value),
            last_updated: obj.get("lastUpdated").and_then(parse_timestamp_value),
            updated_by: text("updatedBy"),
            properties,
        },
    ))
}

fn parse_timestamp_value(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    value.as_str().and_then(parse_timestamp)
}

/// Parse an RFC 3339 timestamp, or a naive ISO-8601 one which is taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// One flattened (API, Platform, Environment) result row. Serializes with
/// the same field names the query language uses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub api_name: String,
    #[serde(rename = "platformID")]
    pub platform_id: PlatformId,
    #[serde(rename = "environmentID")]
    pub environment_id: EnvironmentId,
    pub version: String,
    pub status: DeploymentStatus,
    pub deployment_date: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub updated_by: String,
    pub properties: Properties,
}

/// Addresses a single environment entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeploymentKey {
    pub api_name: String,
    pub platform: PlatformId,
    pub environment: EnvironmentId,
}

impl DeploymentKey {
    pub fn new(api_name: impl Into<String>, platform: PlatformId, environment: EnvironmentId) -> Self {
        DeploymentKey {
            api_name: api_name.into(),
            platform,
            environment,
        }
    }

    pub(crate) fn not_found(&self) -> ApiTrackError {
        ApiTrackError::DeploymentNotFound {
            api: self.api_name.clone(),
            platform: self.platform.to_string(),
            environment: self.environment.to_string(),
        }
    }
}

impl fmt::Display for DeploymentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.api_name, self.platform, self.environment)
    }
}

/// Input to a deploy: creates the API/platform/environment as needed, or
/// overwrites the environment in place.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployRequest {
    pub api_name: String,
    pub platform_id: PlatformId,
    pub environment_id: EnvironmentId,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub status: Option<DeploymentStatus>,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(default)]
    pub properties: Option<Properties>,
}

impl DeployRequest {
    pub fn new(api_name: impl Into<String>, platform_id: PlatformId, environment_id: EnvironmentId) -> Self {
        DeployRequest {
            api_name: api_name.into(),
            platform_id,
            environment_id,
            version: None,
            status: None,
            updated_by: None,
            properties: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_status(mut self, status: DeploymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_updated_by(mut self, updated_by: impl Into<String>) -> Self {
        self.updated_by = Some(updated_by.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties
            .get_or_insert_with(Properties::new)
            .insert(key.into(), value);
        self
    }

    pub fn key(&self) -> DeploymentKey {
        DeploymentKey::new(self.api_name.trim(), self.platform_id, self.environment_id)
    }

    /// Enforce the input limits shared by every write.
    pub fn validate(&self) -> Result<()> {
        let name = self.api_name.trim();
        if name.is_empty() {
            return Err(ApiTrackError::InvalidDeployment(
                "API name cannot be empty or just whitespace".to_string(),
            ));
        }
        if name.chars().count() > MAX_API_NAME_LENGTH {
            return Err(ApiTrackError::InvalidDeployment(format!(
                "API name must be {} characters or less",
                MAX_API_NAME_LENGTH
            )));
        }
        validate_updated_by(self.updated_by.as_deref())?;
        if let Some(props) = &self.properties {
            validate_properties(props)?;
        }
        Ok(())
    }

    /// Build the environment entry this request describes.
    pub(crate) fn to_environment(&self, now: DateTime<Utc>) -> Environment {
        Environment {
            version: self.version.clone().unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            deployment_date: Some(now),
            last_updated: Some(now),
            updated_by: self.updated_by.clone().unwrap_or_default(),
            properties: self.properties.clone().unwrap_or_default(),
        }
    }
}

/// Partial update of an existing environment. `properties` are merged key by
/// key into the existing map.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentPatch {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub status: Option<DeploymentStatus>,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(default)]
    pub properties: Option<Properties>,
}

impl EnvironmentPatch {
    pub fn is_empty(&self) -> bool {
        self.version.is_none()
            && self.status.is_none()
            && self.updated_by.is_none()
            && self.properties.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(ApiTrackError::InvalidDeployment(
                "At least one of version, status, updated_by, properties is required".to_string(),
            ));
        }
        validate_updated_by(self.updated_by.as_deref())?;
        if let Some(props) = &self.properties {
            validate_properties(props)?;
        }
        Ok(())
    }
}

fn validate_updated_by(updated_by: Option<&str>) -> Result<()> {
    match updated_by {
        Some(u) if u.chars().count() > MAX_UPDATED_BY_LENGTH => Err(ApiTrackError::InvalidDeployment(
            format!("updated_by must be {} characters or less", MAX_UPDATED_BY_LENGTH),
        )),
        _ => Ok(()),
    }
}

fn validate_properties(props: &Properties) -> Result<()> {
    if props.len() > MAX_PROPERTIES_PER_DEPLOYMENT {
        return Err(ApiTrackError::InvalidDeployment(format!(
            "Maximum {} properties allowed per deployment",
            MAX_PROPERTIES_PER_DEPLOYMENT
        )));
    }
    for (key, value) in props {
        if key.trim().is_empty() {
            return Err(ApiTrackError::InvalidDeployment(
                "Property key cannot be empty".to_string(),
            ));
        }
        if key.chars().count() > MAX_PROPERTY_KEY_LENGTH {
            return Err(ApiTrackError::InvalidDeployment(format!(
                "Property key too long (max {} chars): {}",
                MAX_PROPERTY_KEY_LENGTH, key
            )));
        }
        let rendered_len = match value {
            serde_json::Value::String(s) => s.chars().count(),
            other => other.to_string().chars().count(),
        };
        if rendered_len > MAX_PROPERTY_VALUE_LENGTH {
            return Err(ApiTrackError::InvalidDeployment(format!(
                "Property value too long (max {} chars): {}",
                MAX_PROPERTY_VALUE_LENGTH, key
            )));
        }
    }
    Ok(())
}

/// What a deploy did to the document tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployOutcome {
    Created,
    PlatformAdded,
    EnvironmentAdded,
    Updated,
}

/// How far a delete cascaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    EnvironmentRemoved,
    PlatformRemoved,
    ApiRemoved,
}

/// Per-call evaluation switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SearchOptions {
    /// Applies to free text and to free-valued fields (apiName, version,
    /// updatedBy, property values). Discrete fields are always case-insensitive.
    pub case_sensitive: bool,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage {
    pub rows: Vec<Row>,
    /// Matching rows across all pages.
    pub total: usize,
    pub total_pages: usize,
    pub page: usize,
    pub page_size: usize,
    /// The document scan hit the configured cap; `total` may be an undercount.
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_apis: usize,
    pub total_platforms: usize,
    pub total_deployments: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("ip4".parse::<PlatformId>().unwrap(), PlatformId::Ip4);
        assert_eq!("PRD".parse::<EnvironmentId>().unwrap(), EnvironmentId::Prd);
        assert_eq!(
            " running ".parse::<DeploymentStatus>().unwrap(),
            DeploymentStatus::Running
        );
        let err = "IP5".parse::<PlatformId>().unwrap_err();
        assert!(err.to_string().contains("Must be one of: IP4, OpenShift"));
    }

    #[test]
    fn rows_serialize_with_query_field_names() {
        let row = Row {
            api_name: "svc".to_string(),
            platform_id: PlatformId::Aws,
            environment_id: EnvironmentId::Prd,
            version: "1.0.0".to_string(),
            status: DeploymentStatus::Running,
            deployment_date: None,
            last_updated: None,
            updated_by: "ci".to_string(),
            properties: Properties::new(),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["apiName"], "svc");
        assert_eq!(json["platformID"], "AWS");
        assert_eq!(json["environmentID"], "prd");
        assert_eq!(json["updatedBy"], "ci");
        assert!(json.get("deploymentDate").is_some());
        assert!(json.get("api_name").is_none());
    }

    #[test]
    fn display_names() {
        assert_eq!(PlatformId::Gcp.display_name(), "Google Cloud Platform");
        assert_eq!(EnvironmentId::Dr.display_name(), "Disaster Recovery");
        assert_eq!(DeploymentStatus::Failed.display_name(), "FAILED");
    }

    #[test]
    fn from_json_skips_malformed_entries() {
        let raw = serde_json::json!({
            "API Name": "orders-api",
            "Platform": [
                {"PlatformID": "IP4", "Environment": [
                    {"environmentID": "prd", "version": "1.0.0", "status": "RUNNING"},
                    {"version": "9.9.9"},
                    "garbage"
                ]},
                {"Environment": [{"environmentID": "dev"}]},
                {"PlatformID": "Mainframe", "Environment": [{"environmentID": "dev"}]},
                {"PlatformID": "AWS", "Environment": [{"environmentID": "tst", "status": "bogus"}]}
            ]
        });
        let doc = ApiDocument::from_json(&raw).unwrap();
        assert_eq!(doc.platforms.len(), 2);
        assert_eq!(doc.deployment_count(), 2);
        let tst = doc.environment(PlatformId::Aws, EnvironmentId::Tst).unwrap();
        assert_eq!(tst.status, DeploymentStatus::Unknown);
        assert!(tst.properties.is_empty());
    }

    #[test]
    fn to_json_from_json_preserves_document() {
        let mut doc = ApiDocument::new("billing");
        let mut env = Environment {
            version: "2.0.1".to_string(),
            status: DeploymentStatus::Deployed,
            updated_by: "ops".to_string(),
            last_updated: parse_timestamp("2024-03-01T10:00:00Z"),
            ..Default::default()
        };
        env.properties
            .insert("owner".to_string(), serde_json::json!("team-billing"));
        doc.platforms
            .entry(PlatformId::Gcp)
            .or_default()
            .environments
            .insert(EnvironmentId::Stg, env);

        let back = ApiDocument::from_json(&doc.to_json()).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn naive_timestamps_are_utc() {
        let ts = parse_timestamp("2024-01-31T08:30:00.123").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-31T08:30:00.123+00:00");
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn deploy_request_validation() {
        let ok = DeployRequest::new("svc", PlatformId::Docker, EnvironmentId::Dev)
            .with_property("owner", serde_json::json!("me"));
        assert!(ok.validate().is_ok());

        let blank = DeployRequest::new("   ", PlatformId::Docker, EnvironmentId::Dev);
        assert!(blank.validate().is_err());

        let long_value = DeployRequest::new("svc", PlatformId::Docker, EnvironmentId::Dev)
            .with_property("notes", serde_json::json!("x".repeat(1001)));
        assert!(long_value.validate().is_err());

        assert!(EnvironmentPatch::default().validate().is_err());
    }

    #[test]
    fn deploy_request_deserializes_enum_strings() {
        let req: DeployRequest = serde_json::from_value(serde_json::json!({
            "api_name": "svc",
            "platform_id": "kubernetes",
            "environment_id": "UAT",
            "status": "deploying"
        }))
        .unwrap();
        assert_eq!(req.platform_id, PlatformId::Kubernetes);
        assert_eq!(req.environment_id, EnvironmentId::Uat);
        assert_eq!(req.status, Some(DeploymentStatus::Deploying));
    }
}
