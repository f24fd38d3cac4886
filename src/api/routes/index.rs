//! HTML listing of all metrics

use std::fmt::Write;

use axum::{extract::State, response::Html};

use crate::{
    api::{error::ApiResult, state::ApiState},
    metric::MetricCollection,
};

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render(metrics: &MetricCollection) -> String {
    let mut page = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n    <title>Metrics</title>\n</head>\n<body>\n    <h1>Metrics</h1>\n    <ul>\n",
    );

    for metric in metrics.iter() {
        // Writing to a String cannot fail
        let _ = writeln!(
            page,
            "        <li>{}: {} ({})</li>",
            escape(&metric.id),
            metric.value,
            metric.kind()
        );
    }

    page.push_str("    </ul>\n</body>\n</html>\n");
    page
}

/// GET /
pub async fn list_metrics(State(state): State<ApiState>) -> ApiResult<Html<String>> {
    let metrics = state.repository.get_metrics().await?;
    Ok(Html(render(&metrics)))
}
