//! Metric update endpoints

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use tracing::debug;

use crate::{
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
        types::StoredResponse,
    },
    metric::Metric,
};

/// POST /update/:type/:name/:value
///
/// Store a single metric given entirely in the path
pub async fn update_from_path(
    State(state): State<ApiState>,
    Path((kind, name, value)): Path<(String, String, String)>,
) -> ApiResult<String> {
    let metric = Metric::parse(&kind, &name, &value)
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

    state.repository.save_metric(metric).await?;

    Ok(format!(
        "metric {name} of type {kind} with value {value} has been set successfully"
    ))
}

/// POST /update/
///
/// Store a single JSON metric and answer with its value after the merge
pub async fn update_json(
    State(state): State<ApiState>,
    payload: Result<Json<Metric>, JsonRejection>,
) -> ApiResult<Json<Metric>> {
    let Json(metric) = payload?;
    let (kind, id) = (metric.kind(), metric.id.clone());

    state.repository.save_metric(metric).await?;
    let stored = state.repository.get_metric(kind, &id).await?;

    Ok(Json(stored))
}

/// POST /updates/
///
/// Store a JSON array of metrics
pub async fn update_batch(
    State(state): State<ApiState>,
    payload: Result<Json<Vec<Metric>>, JsonRejection>,
) -> ApiResult<Json<StoredResponse>> {
    let Json(metrics) = payload?;
    let stored = metrics.len();

    debug!("received batch of {stored} metrics");
    state.repository.save_metrics(metrics).await?;

    Ok(Json(StoredResponse { stored }))
}
