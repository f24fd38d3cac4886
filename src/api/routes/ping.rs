//! Health check endpoint

use axum::{Json, extract::State};

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::HealthResponse,
};

/// GET /ping
///
/// 200 when the storage backend answers, 500 otherwise
pub async fn ping(State(state): State<ApiState>) -> ApiResult<Json<HealthResponse>> {
    let status = state.repository.ping().await?;

    if !status.healthy {
        return Err(ApiError::StorageError(status.message));
    }

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        backend: state.repository.backend().kind().to_string(),
        message: status.message,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}
