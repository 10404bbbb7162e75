use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::time::Instant;
use uuid::Uuid;
use vitrine_api::{ApiErrorCode, RunAccepted, RunRequest};
use vitrine_model::BrandingInput;

use super::{api_error_response, error_json, propagated_request_id, with_request_id};
use crate::simulate::{execute_run, RunState, SimulationPlan};
use crate::AppState;

/// Accepts a run and drives it from a background task; callers poll the
/// status endpoint with the returned id.
pub(crate) async fn trigger_run_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RunRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let route = "/api/runs";

    let Ok(Json(req)) = body else {
        let resp = api_error_response(
            StatusCode::BAD_REQUEST,
            error_json(
                ApiErrorCode::InvalidRequestBody,
                "request body must be JSON with logo_url and primary_color",
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

    let current = state.branding.current().await;
    let plan = SimulationPlan::from_config(
        &state.api,
        BrandingInput {
            logo_url: req.logo_url,
            primary_color: req.primary_color,
            domain: current.domain,
        },
    );

    let run_id = state.runs.insert_pending();
    tokio::spawn(execute_run(state.runs.clone(), run_id, plan));
    tracing::info!(run_id = %run_id, "simulation run accepted");

    let resp = (
        StatusCode::ACCEPTED,
        Json(RunAccepted {
            run_id,
            status: RunState::Pending.as_str().to_string(),
        }),
    )
        .into_response();
    state
        .metrics
        .observe_request(route, StatusCode::ACCEPTED, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn run_status_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(run_id): Path<Uuid>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let route = "/api/runs/{run_id}";

    match state.runs.get(run_id) {
        Some(record) => {
            let resp = Json(record.to_status()).into_response();
            state
                .metrics
                .observe_request(route, StatusCode::OK, started.elapsed())
                .await;
            with_request_id(resp, &request_id)
        }
        None => {
            let resp = api_error_response(
                StatusCode::NOT_FOUND,
                error_json(
                    ApiErrorCode::NotFound,
                    "run not found",
                    json!({"run_id": run_id}),
                )
                .with_request_id(&request_id),
            );
            state
                .metrics
                .observe_request(route, StatusCode::NOT_FOUND, started.elapsed())
                .await;
            with_request_id(resp, &request_id)
        }
    }
}
