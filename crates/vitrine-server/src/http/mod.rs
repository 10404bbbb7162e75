pub(crate) mod auth;
pub(crate) mod branding;
pub(crate) mod brands;
pub(crate) mod ops;
pub(crate) mod runs;
pub(crate) mod shell;

use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use vitrine_api::{ApiError, ApiErrorCode};
use vitrine_model::UserId;

use crate::auth::verify_token;
use crate::AppState;

pub(crate) fn api_error_response(status: StatusCode, err: ApiError) -> Response {
    let body = Json(json!({"error": err}));
    (status, body).into_response()
}

pub(crate) fn error_json(code: ApiErrorCode, message: &str, details: Value) -> ApiError {
    ApiError::new(code, message, details, "req-unknown")
}

pub(crate) fn make_request_id(state: &AppState) -> String {
    let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
    format!("req-{id:016x}")
}

pub(crate) fn propagated_request_id(headers: &HeaderMap, state: &AppState) -> String {
    if let Some(raw) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    if let Some(raw) = headers.get("traceparent").and_then(|v| v.to_str().ok()) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return format!("trace-{trimmed}");
        }
    }
    make_request_id(state)
}

pub(crate) fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(v) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", v);
    }
    response
}

/// 401 with the OAuth2 challenge header.
pub(crate) fn unauthorized_response(request_id: &str) -> Response {
    let mut resp = api_error_response(
        StatusCode::UNAUTHORIZED,
        ApiError::unauthorized().with_request_id(request_id),
    );
    resp.headers_mut()
        .insert("www-authenticate", HeaderValue::from_static("Bearer"));
    resp
}

/// Extracts and verifies the bearer token, yielding the subject user id.
pub(crate) fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    request_id: &str,
) -> Result<UserId, Response> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let (scheme, rest) = v.split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| rest.trim())
        })
        .ok_or_else(|| unauthorized_response(request_id))?;
    verify_token(
        state.api.token_secret.as_bytes(),
        token,
        SystemTime::now(),
    )
    .map_err(|_| unauthorized_response(request_id))
}
