// handlers/protected/projects.rs - /api/v1/projects
//
// Every handler checks access once on entry through services::guard, which
// layers the admin override over the AccessDirectory.

use axum::{
    extract::{Query, State},
    Extension,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::Project;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::services::guard;
use crate::services::project_service::{ProjectCreate, ProjectUpdate};

use super::PageQuery;

/// GET /api/v1/projects - admins see every project, everyone else the
/// projects they own followed by the ones granted to them
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<Project>> {
    let projects = if user.role.is_admin() {
        state.projects.list(query.page(), query.page_size()).await?
    } else {
        state
            .resolver
            .accessible_projects(user.user_id, query.page(), query.page_size())
            .await?
    };
    Ok(ApiResponse::success(projects))
}

/// POST /api/v1/projects - the requester becomes the owner
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(input): ApiJson<ProjectCreate>,
) -> ApiResult<Project> {
    let project = state.projects.create(user.user_id, input).await?;
    Ok(ApiResponse::created(project))
}

/// GET /api/v1/projects/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Project> {
    guard::require_view(&state.directory, user.identity(), id).await?;
    let project = state.projects.get(id).await?;
    Ok(ApiResponse::success(project))
}

/// PUT /api/v1/projects/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<ProjectUpdate>,
) -> ApiResult<Project> {
    guard::require_edit(&state.directory, user.identity(), id).await?;
    let project = state.projects.update(id, input).await?;
    Ok(ApiResponse::success(project))
}

/// DELETE /api/v1/projects/:id - owner or admin
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Value> {
    guard::require_owner(&state.directory, user.identity(), id).await?;
    state.projects.delete(id).await?;
    Ok(ApiResponse::success(json!({ "message": "Project deleted successfully" })))
}
