//! Metric lookup endpoints

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};

use crate::{
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
        types::MetricQuery,
    },
    metric::{Metric, MetricKind},
};

/// Unknown types cannot have been stored, so they are reported as missing
fn parse_kind(kind: &str, id: &str) -> ApiResult<MetricKind> {
    kind.parse()
        .map_err(|_| ApiError::NotFound(format!("{kind} metric {id:?} not found")))
}

/// GET /value/:type/:name
///
/// Current value as plain text: the gauge value or the counter total
pub async fn value_from_path(
    State(state): State<ApiState>,
    Path((kind, name)): Path<(String, String)>,
) -> ApiResult<String> {
    let kind = parse_kind(&kind, &name)?;
    let metric = state.repository.get_metric(kind, &name).await?;

    Ok(metric.value.to_string())
}

/// POST /value/
///
/// Current value of the metric named in the JSON body
pub async fn value_json(
    State(state): State<ApiState>,
    payload: Result<Json<MetricQuery>, JsonRejection>,
) -> ApiResult<Json<Metric>> {
    let Json(query) = payload?;
    let kind = parse_kind(&query.kind, &query.id)?;
    let metric = state.repository.get_metric(kind, &query.id).await?;

    Ok(Json(metric))
}
