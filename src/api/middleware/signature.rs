//! Request signature middleware
//!
//! When the server has a key, update bodies must carry a matching
//! `HashSHA256` header. The body is buffered, checked and handed on
//! unchanged.

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::api::{error::ApiError, state::ApiState};
use crate::signature::SIGNATURE_HEADER;

/// Largest body the signature check will buffer
const MAX_SIGNED_BODY: usize = 16 * 1024 * 1024;

/// Signature check
///
/// Passes requests through untouched when no key is configured.
pub async fn verify_signature(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(key) = &state.key else {
        return Ok(next.run(request).await);
    };

    let signature = request
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .ok_or_else(|| {
            warn!("rejecting unsigned request to {}", request.uri().path());
            ApiError::InvalidRequest(format!("missing {SIGNATURE_HEADER} header"))
        })?;

    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_SIGNED_BODY)
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("failed to read body: {e}")))?;

    if !key.verify(&bytes, &signature) {
        warn!("rejecting request to {} with bad signature", parts.uri.path());
        return Err(ApiError::InvalidRequest("signature mismatch".to_string()));
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
