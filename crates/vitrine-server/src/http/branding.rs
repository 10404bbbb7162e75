use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::time::Instant;
use vitrine_api::ApiErrorCode;
use vitrine_model::BrandingInput;

use super::{api_error_response, error_json, propagated_request_id, with_request_id};
use crate::AppState;

pub(crate) async fn get_branding_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let resp = Json(state.branding.current().await).into_response();
    state
        .metrics
        .observe_request("/api/branding", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

/// Applying branding never fails once the body parses; persistence problems
/// stay server-side and the derived state is still returned.
pub(crate) async fn apply_branding_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<BrandingInput>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let route = "/api/branding";

    let Ok(Json(input)) = body else {
        let resp = api_error_response(
            StatusCode::BAD_REQUEST,
            error_json(
                ApiErrorCode::InvalidRequestBody,
                "request body must be JSON with logo_url, primary_color, domain",
                json!({}),
            )
            .with_request_id(&request_id),
        );
        state
            .metrics
            .observe_request(route, StatusCode::BAD_REQUEST, started.elapsed())
            .await;
        return with_request_id(resp, &request_id);
    };

    let applied = state.branding.apply(&input).await;
    let resp = Json(applied).into_response();
    state
        .metrics
        .observe_request(route, StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}
