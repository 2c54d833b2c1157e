use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use apitrack::error::ApiTrackError;
use apitrack::{DeployOutcome, DeployRequest, EnvironmentPatch, Row};

use super::{deployment_key, run_blocking, AppState};
use crate::dto::{
    DataResponse, DeleteResponse, DeployResponse, EnvironmentBody, ValidationResponse,
};

type DeploymentPath = Path<(String, String, String)>;

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiTrackError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiTrackError::InvalidDeployment(format!("Invalid JSON: {}", e)))
}

/// `POST /api/deploy`: create or overwrite one deployment.
pub async fn deploy(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<DeployResponse>), ApiTrackError> {
    let request: DeployRequest = parse_body(&body)?;
    let (outcome, row) = run_blocking(move || {
        let outcome = state.registry.deploy(&request)?;
        state.persist()?;
        let row = state.registry.get_deployment(&request.key())?;
        Ok((outcome, row))
    })
    .await?;

    let code = match outcome {
        DeployOutcome::Updated => StatusCode::OK,
        _ => StatusCode::CREATED,
    };
    Ok((
        code,
        Json(DeployResponse {
            status: "success",
            outcome,
            data: row,
        }),
    ))
}

/// `POST /api/deploy/validate`: run the deploy checks without writing.
pub async fn validate_deployment(
    body: Bytes,
) -> Result<Json<ValidationResponse>, ApiTrackError> {
    let request: DeployRequest = parse_body(&body)?;
    request.validate()?;
    tracing::debug!("[STORE] dry run accepted for {}", request.key());
    Ok(Json(ValidationResponse {
        status: "success",
        valid: true,
        message: "Deployment request is valid",
    }))
}

/// `GET /api/apis/:api`: the stored document in its wire shape.
pub async fn get_api(
    State(state): State<Arc<AppState>>,
    Path(api): Path<String>,
) -> Result<Json<DataResponse<serde_json::Value>>, ApiTrackError> {
    let doc = run_blocking(move || state.registry.get_api(&api)).await?;
    Ok(Json(DataResponse::success(doc.to_json())))
}

/// `GET /api/apis/:api/platforms/:platform/environments/:env`
pub async fn get_deployment(
    State(state): State<Arc<AppState>>,
    Path((api, platform, environment)): DeploymentPath,
) -> Result<Json<DataResponse<Row>>, ApiTrackError> {
    let key = deployment_key(&api, &platform, &environment)?;
    let row = run_blocking(move || state.registry.get_deployment(&key)).await?;
    Ok(Json(DataResponse::success(row)))
}

/// `PUT`: full overwrite. Fields missing from the body are reset.
pub async fn put_deployment(
    State(state): State<Arc<AppState>>,
    Path((api, platform, environment)): DeploymentPath,
    body: Bytes,
) -> Result<Json<DataResponse<Row>>, ApiTrackError> {
    let key = deployment_key(&api, &platform, &environment)?;
    let fields: EnvironmentBody = parse_body(&body)?;
    let request = DeployRequest {
        api_name: key.api_name.clone(),
        platform_id: key.platform,
        environment_id: key.environment,
        version: fields.version,
        status: fields.status,
        updated_by: fields.updated_by,
        properties: fields.properties,
    };

    let row = run_blocking(move || {
        state.registry.replace(&request)?;
        state.persist()?;
        state.registry.get_deployment(&key)
    })
    .await?;
    Ok(Json(DataResponse::success(row)))
}

/// `PATCH`: partial update, properties merged key by key.
pub async fn patch_deployment(
    State(state): State<Arc<AppState>>,
    Path((api, platform, environment)): DeploymentPath,
    body: Bytes,
) -> Result<Json<DataResponse<Row>>, ApiTrackError> {
    let key = deployment_key(&api, &platform, &environment)?;
    let fields: EnvironmentBody = parse_body(&body)?;
    let patch = EnvironmentPatch {
        version: fields.version,
        status: fields.status,
        updated_by: fields.updated_by,
        properties: fields.properties,
    };

    let row = run_blocking(move || {
        state.registry.update(&key, &patch)?;
        state.persist()?;
        state.registry.get_deployment(&key)
    })
    .await?;
    Ok(Json(DataResponse::success(row)))
}

/// `DELETE`: remove one deployment, cascading to empty platforms and APIs.
pub async fn delete_deployment(
    State(state): State<Arc<AppState>>,
    Path((api, platform, environment)): DeploymentPath,
) -> Result<Json<DeleteResponse>, ApiTrackError> {
    let key = deployment_key(&api, &platform, &environment)?;
    let outcome = run_blocking(move || {
        let outcome = state.registry.delete(&key)?;
        state.persist()?;
        Ok(outcome)
    })
    .await?;
    Ok(Json(DeleteResponse {
        status: "success",
        outcome,
    }))
}
