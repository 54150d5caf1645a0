//! # Authentication
//!
//! Optional bearer-key check. When `server.api_key` (or
//! `DENSEEDIA_API_KEY`) is set, every route except `/health` needs:
//!
//! ```text
//! Authorization: Bearer <key>
//! ```

use super::types::ErrorResponse;
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Constant-time key comparison.
///
/// Both sides are walked to the longer length, so the time taken does not
/// depend on where the first mismatch is or on the expected key's length.
pub fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    let len = provided.len().max(expected.len());
    let mut same = (provided.len() as u64).ct_eq(&(expected.len() as u64));
    for i in 0..len {
        let a = provided.get(i).copied().unwrap_or(0);
        let b = expected.get(i).copied().unwrap_or(0);
        same &= a.ct_eq(&b);
    }
    bool::from(same)
}

fn unauthorized(reason: &'static str) -> Response {
    tracing::warn!(event = "auth_failure", reason, "request rejected");
    let body = ErrorResponse {
        error: "Unauthorized".to_string(),
        code: "unauthorized".to_string(),
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

/// Require the configured key on every route but `/health`.
pub async fn api_key_auth_middleware(
    State(expected): State<Arc<str>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let Some(header_value) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return unauthorized("missing_authorization_header");
    };

    let Some(provided) = header_value.strip_prefix("Bearer ") else {
        return unauthorized("not_a_bearer_token");
    };

    if keys_match(provided.trim().as_bytes(), expected.as_bytes()) {
        next.run(request).await
    } else {
        unauthorized("invalid_api_key")
    }
}
