// handlers/public/auth/mod.rs - Public authentication handlers
//
// Token acquisition endpoints that do not require authentication.

use axum::extract::State;

use crate::app::AppState;
use crate::database::models::User;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::auth_service::{LoginResponse, UserCreate, UserLogin};

/// POST /api/v1/auth/register - create a new account (role defaults to "user")
pub async fn register(State(state): State<AppState>, ApiJson(input): ApiJson<UserCreate>) -> ApiResult<User> {
    let user = state.auth.register(input).await?;
    Ok(ApiResponse::created(user))
}

/// POST /api/v1/auth/login - exchange email and password for a bearer token
pub async fn login(State(state): State<AppState>, ApiJson(input): ApiJson<UserLogin>) -> ApiResult<LoginResponse> {
    let response = state.auth.login(input).await?;
    Ok(ApiResponse::success(response))
}
