// Two security tiers:
// Public (no auth, /auth/*) → Protected (JWT auth, everything else under /api/v1)
pub mod protected;
pub mod public;

use axum::extract::State;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::StoreError;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /health - liveness plus a store ping
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    state.health.ping().await.map_err(store_unavailable)?;

    Ok(ApiResponse::success(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "database": "ok"
    })))
}

/// The store error is logged; callers only learn that the database is down
fn store_unavailable(err: StoreError) -> ApiError {
    tracing::error!("Health check failed: {}", err);
    ApiError::service_unavailable("Database unavailable")
}
