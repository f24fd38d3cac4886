//! Request and response bodies of the JSON routes

use serde::{Deserialize, Serialize};

/// Body of `POST /value/`
///
/// Only `id` and `type` matter; value fields sent along are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricQuery {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,
}

/// Response of `POST /updates/`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredResponse {
    pub stored: usize,
}

/// Response of `GET /ping`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub backend: String,
    pub message: String,
    pub timestamp: String,
}
