use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Instant;
use vitrine_api::{parse_proxy_image_params, parse_search_brands_params, ApiErrorCode};

use super::{api_error_response, error_json, propagated_request_id, with_request_id};
use crate::brands::BrandError;
use crate::AppState;

pub(crate) async fn search_brands_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let route = "/api/search-brands";

    let parsed = match parse_search_brands_params(&params) {
        Ok(parsed) => parsed,
        Err(e) => {
            let resp = api_error_response(
                StatusCode::BAD_REQUEST,
                e.with_request_id(&request_id),
            );
            state
                .metrics
                .observe_request(route, StatusCode::BAD_REQUEST, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };

    match state.brands.search(&parsed.query).await {
        Ok(results) => {
            let resp = Json(results).into_response();
            state
                .metrics
                .observe_request(route, StatusCode::OK, started.elapsed())
                .await;
            with_request_id(resp, &request_id)
        }
        Err(BrandError::NotConfigured) => {
            let resp = api_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                error_json(
                    ApiErrorCode::Internal,
                    "brand search is not configured",
                    json!({}),
                )
                .with_request_id(&request_id),
            );
            state
                .metrics
                .observe_request(route, StatusCode::INTERNAL_SERVER_ERROR, started.elapsed())
                .await;
            with_request_id(resp, &request_id)
        }
        Err(e) => {
            tracing::warn!(error = %e, query = %parsed.query, "brand search failed");
            let resp = api_error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                error_json(
                    ApiErrorCode::UpstreamUnavailable,
                    "brand search upstream unavailable",
                    json!({"message": e.to_string()}),
                )
                .with_request_id(&request_id),
            );
            state
                .metrics
                .observe_request(route, StatusCode::SERVICE_UNAVAILABLE, started.elapsed())
                .await;
            with_request_id(resp, &request_id)
        }
    }
}

/// Fetches a remote logo and relays it with its origin content type, so the
/// browser never talks to the logo CDN directly.
pub(crate) async fn proxy_image_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let route = "/api/proxy-image";

    let parsed = match parse_proxy_image_params(&params) {
        Ok(parsed) => parsed,
        Err(e) => {
            let resp = api_error_response(
                StatusCode::BAD_REQUEST,
                e.with_request_id(&request_id),
            );
            state
                .metrics
                .observe_request(route, StatusCode::BAD_REQUEST, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };

    match state.brands.fetch_image(&parsed.url).await {
        Ok(image) => {
            let content_type = HeaderValue::from_str(&image.content_type)
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
            let mut resp = (StatusCode::OK, image.bytes).into_response();
            resp.headers_mut().insert("content-type", content_type);
            resp.headers_mut().insert(
                "cache-control",
                HeaderValue::from_static("public, max-age=3600"),
            );
            state
                .metrics
                .observe_request(route, StatusCode::OK, started.elapsed())
                .await;
            with_request_id(resp, &request_id)
        }
        Err(BrandError::NotAnImage(content_type)) => {
            let resp = api_error_response(
                StatusCode::BAD_REQUEST,
                error_json(
                    ApiErrorCode::InvalidQueryParameter,
                    "url does not point at an image",
                    json!({"content_type": content_type}),
                )
                .with_request_id(&request_id),
            );
            state
                .metrics
                .observe_request(route, StatusCode::BAD_REQUEST, started.elapsed())
                .await;
            with_request_id(resp, &request_id)
        }
        Err(e) => {
            tracing::warn!(error = %e, url = %parsed.url, "image proxy fetch failed");
            let resp = api_error_response(
                StatusCode::BAD_GATEWAY,
                error_json(
                    ApiErrorCode::UpstreamUnavailable,
                    "image fetch failed",
                    json!({"message": e.to_string()}),
                )
                .with_request_id(&request_id),
            );
            state
                .metrics
                .observe_request(route, StatusCode::BAD_GATEWAY, started.elapsed())
                .await;
            with_request_id(resp, &request_id)
        }
    }
}
