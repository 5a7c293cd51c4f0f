// handlers/protected/access.rs - /api/v1/projects/:id/access
//
// Grant management is owner-only; the admin role does not bypass it.

use axum::{
    extract::State,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::{AccessGrant, AccessLevel};
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::services::guard;

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub user_id: i64,
    pub level: AccessLevel,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub level: AccessLevel,
}

/// GET /api/v1/projects/:id/access - grants on the project, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(project_id): ApiPath<i64>,
) -> ApiResult<Vec<AccessGrant>> {
    guard::require_strict_owner(&state.directory, user.identity(), project_id).await?;
    let grants = state.directory.list_grants(project_id).await?;
    Ok(ApiResponse::success(grants))
}

/// POST /api/v1/projects/:id/access
pub async fn grant(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(project_id): ApiPath<i64>,
    ApiJson(input): ApiJson<GrantRequest>,
) -> ApiResult<AccessGrant> {
    let grant = state
        .directory
        .grant_access(project_id, user.user_id, input.user_id, input.level)
        .await?;
    Ok(ApiResponse::created(grant))
}

/// PUT /api/v1/projects/:id/access/:access_id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath((project_id, access_id)): ApiPath<(i64, i64)>,
    ApiJson(input): ApiJson<UpdateRequest>,
) -> ApiResult<AccessGrant> {
    guard::require_strict_owner(&state.directory, user.identity(), project_id).await?;
    state.directory.grant_in_project(project_id, access_id).await?;
    let grant = state
        .directory
        .update_access(access_id, user.user_id, input.level)
        .await?;
    Ok(ApiResponse::success(grant))
}

/// DELETE /api/v1/projects/:id/access/:access_id
pub async fn revoke(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath((project_id, access_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Value> {
    guard::require_strict_owner(&state.directory, user.identity(), project_id).await?;
    state.directory.grant_in_project(project_id, access_id).await?;
    state.directory.revoke_access(access_id, user.user_id).await?;
    Ok(ApiResponse::success(json!({ "message": "Access revoked successfully" })))
}

/// GET /api/v1/me/access - grants held by the caller
pub async fn mine(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Vec<AccessGrant>> {
    let grants = state.directory.list_user_grants(user.user_id).await?;
    Ok(ApiResponse::success(grants))
}
