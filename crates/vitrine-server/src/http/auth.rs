//! Account and payment endpoints.
//!
//! The two incident flags short-circuit these handlers with a 500 after the
//! cheap validation steps, mimicking a misbehaving deploy: signup fails after
//! the duplicate check, login fails after the user lookup but before the
//! password check.

use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde_json::json;
use std::time::{Instant, SystemTime};
use vitrine_api::{
    ApiErrorCode, CheckoutRequest, CheckoutResponse, LoginForm, SignupRequest, TokenResponse,
};
use vitrine_model::{parse_email, FlagKey, ProfileUpdate};

use super::{
    api_error_response, authenticate, error_json, propagated_request_id, unauthorized_response,
    with_request_id,
};
use crate::auth::{mint_token, TOKEN_TYPE};
use crate::store::users::UserStoreError;
use crate::AppState;

const OUTAGE_MESSAGE: &str = "Service temporarily unavailable. Please try again later.";

/// Reads a flag and counts the evaluation in telemetry.
async fn evaluate_flag(state: &AppState, key: FlagKey, context_kind: &str) -> bool {
    state
        .metrics
        .track_event(&format!("flag.{}", key.name()), context_kind)
        .await;
    state.flags.get(key)
}

async fn outage_active(state: &AppState, context_kind: &str) -> bool {
    let release_new_auth = evaluate_flag(state, FlagKey::ReleaseNewAuth, context_kind).await;
    let disaster_mode = evaluate_flag(state, FlagKey::EnableDisasterMode, context_kind).await;
    release_new_auth || disaster_mode
}

async fn outage_response(state: &AppState, context_kind: &str, request_id: &str) -> Response {
    state.metrics.track_event("http.500", context_kind).await;
    tracing::error!(context = context_kind, "incident flag forced a 500");
    api_error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        error_json(ApiErrorCode::ServiceUnavailable, OUTAGE_MESSAGE, json!({}))
            .with_request_id(request_id),
    )
}

pub(crate) async fn signup_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let route = "/api/signup";

    let Ok(Json(req)) = body else {
        let resp = api_error_response(
            StatusCode::BAD_REQUEST,
            error_json(
                ApiErrorCode::InvalidRequestBody,
                "request body must be JSON with email and password",
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

    let email = match parse_email(&req.email) {
        Ok(email) => email,
        Err(e) => {
            let resp = api_error_response(
                StatusCode::BAD_REQUEST,
                error_json(
                    ApiErrorCode::InvalidRequestBody,
                    &e.to_string(),
                    json!({"field": "email"}),
                )
                .with_request_id(&request_id),
            );
            state
                .metrics
                .observe_request(route, StatusCode::BAD_REQUEST, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };

    if state.users.find_by_email(&email).await.is_some() {
        let resp = api_error_response(
            StatusCode::BAD_REQUEST,
            error_json(
                ApiErrorCode::EmailAlreadyRegistered,
                "Email already registered",
                json!({}),
            )
            .with_request_id(&request_id),
        );
        state
            .metrics
            .observe_request(route, StatusCode::BAD_REQUEST, started.elapsed())
            .await;
        return with_request_id(resp, &request_id);
    }

    if outage_active(&state, "anonymous").await {
        let resp = outage_response(&state, "anonymous", &request_id).await;
        state
            .metrics
            .observe_request(route, StatusCode::INTERNAL_SERVER_ERROR, started.elapsed())
            .await;
        return with_request_id(resp, &request_id);
    }

    match state.users.create(&email, &req.password).await {
        Ok(record) => {
            tracing::info!(user_id = %record.id, "user signed up");
            let resp = Json(record.public()).into_response();
            state
                .metrics
                .observe_request(route, StatusCode::OK, started.elapsed())
                .await;
            with_request_id(resp, &request_id)
        }
        Err(e) => {
            let code = match e {
                UserStoreError::EmailTaken => ApiErrorCode::EmailAlreadyRegistered,
                _ => ApiErrorCode::InvalidRequestBody,
            };
            let resp = api_error_response(
                StatusCode::BAD_REQUEST,
                error_json(code, &e.to_string(), json!({})).with_request_id(&request_id),
            );
            state
                .metrics
                .observe_request(route, StatusCode::BAD_REQUEST, started.elapsed())
                .await;
            with_request_id(resp, &request_id)
        }
    }
}

pub(crate) async fn token_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let route = "/api/token";

    let Ok(Form(form)) = body else {
        let resp = api_error_response(
            StatusCode::BAD_REQUEST,
            error_json(
                ApiErrorCode::InvalidRequestBody,
                "form body must include username and password",
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

    let Some(record) = state.users.find_by_email(&form.username).await else {
        let resp = invalid_credentials_response(&request_id);
        state
            .metrics
            .observe_request(route, StatusCode::UNAUTHORIZED, started.elapsed())
            .await;
        return with_request_id(resp, &request_id);
    };

    if outage_active(&state, "user").await {
        let resp = outage_response(&state, "user", &request_id).await;
        state
            .metrics
            .observe_request(route, StatusCode::INTERNAL_SERVER_ERROR, started.elapsed())
            .await;
        return with_request_id(resp, &request_id);
    }

    if !crate::store::users::verify_password(&record, &form.password) {
        let resp = invalid_credentials_response(&request_id);
        state
            .metrics
            .observe_request(route, StatusCode::UNAUTHORIZED, started.elapsed())
            .await;
        return with_request_id(resp, &request_id);
    }

    match mint_token(
        state.api.token_secret.as_bytes(),
        record.id,
        state.api.token_ttl,
        SystemTime::now(),
    ) {
        Ok(access_token) => {
            let resp = Json(TokenResponse {
                access_token,
                token_type: TOKEN_TYPE.to_string(),
            })
            .into_response();
            state
                .metrics
                .observe_request(route, StatusCode::OK, started.elapsed())
                .await;
            with_request_id(resp, &request_id)
        }
        Err(e) => {
            tracing::error!(error = %e, "token minting failed");
            let resp = api_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                error_json(ApiErrorCode::Internal, "token minting failed", json!({}))
                    .with_request_id(&request_id),
            );
            state
                .metrics
                .observe_request(route, StatusCode::INTERNAL_SERVER_ERROR, started.elapsed())
                .await;
            with_request_id(resp, &request_id)
        }
    }
}

fn invalid_credentials_response(request_id: &str) -> Response {
    let mut resp = api_error_response(
        StatusCode::UNAUTHORIZED,
        error_json(
            ApiErrorCode::InvalidCredentials,
            "Incorrect email or password",
            json!({}),
        )
        .with_request_id(request_id),
    );
    resp.headers_mut().insert(
        "www-authenticate",
        axum::http::HeaderValue::from_static("Bearer"),
    );
    resp
}

pub(crate) async fn me_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let route = "/api/me";

    let user_id = match authenticate(&state, &headers, &request_id) {
        Ok(id) => id,
        Err(resp) => {
            state
                .metrics
                .observe_request(route, StatusCode::UNAUTHORIZED, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };

    match state.users.get(user_id).await {
        Some(record) => {
            let resp = Json(record.public()).into_response();
            state
                .metrics
                .observe_request(route, StatusCode::OK, started.elapsed())
                .await;
            with_request_id(resp, &request_id)
        }
        None => {
            let resp = user_not_found_response(&request_id);
            state
                .metrics
                .observe_request(route, StatusCode::NOT_FOUND, started.elapsed())
                .await;
            with_request_id(resp, &request_id)
        }
    }
}

pub(crate) async fn update_me_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let route = "/api/me";

    let user_id = match authenticate(&state, &headers, &request_id) {
        Ok(id) => id,
        Err(resp) => {
            state
                .metrics
                .observe_request(route, StatusCode::UNAUTHORIZED, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };

    let Ok(Json(update)) = body else {
        let resp = api_error_response(
            StatusCode::BAD_REQUEST,
            error_json(
                ApiErrorCode::InvalidRequestBody,
                "request body must be a JSON profile update",
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

    match state.users.update_profile(user_id, &update).await {
        Some(record) => {
            let resp = Json(record.public()).into_response();
            state
                .metrics
                .observe_request(route, StatusCode::OK, started.elapsed())
                .await;
            with_request_id(resp, &request_id)
        }
        None => {
            let resp = user_not_found_response(&request_id);
            state
                .metrics
                .observe_request(route, StatusCode::NOT_FOUND, started.elapsed())
                .await;
            with_request_id(resp, &request_id)
        }
    }
}

fn user_not_found_response(request_id: &str) -> Response {
    api_error_response(
        StatusCode::NOT_FOUND,
        error_json(ApiErrorCode::NotFound, "User not found", json!({}))
            .with_request_id(request_id),
    )
}

pub(crate) async fn checkout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let route = "/api/checkout";

    let user_id = match authenticate(&state, &headers, &request_id) {
        Ok(id) => id,
        Err(resp) => {
            state
                .metrics
                .observe_request(route, StatusCode::UNAUTHORIZED, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };
    if state.users.get(user_id).await.is_none() {
        let resp = unauthorized_response(&request_id);
        state
            .metrics
            .observe_request(route, StatusCode::UNAUTHORIZED, started.elapsed())
            .await;
        return with_request_id(resp, &request_id);
    }

    let Ok(Json(req)) = body else {
        let resp = api_error_response(
            StatusCode::BAD_REQUEST,
            error_json(
                ApiErrorCode::InvalidRequestBody,
                "request body must be a JSON checkout request",
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

    if let Err(reason) = validate_card(&req) {
        let resp = api_error_response(
            StatusCode::BAD_REQUEST,
            error_json(
                ApiErrorCode::PaymentRejected,
                reason,
                json!({"field_errors": reason}),
            )
            .with_request_id(&request_id),
        );
        state
            .metrics
            .observe_request(route, StatusCode::BAD_REQUEST, started.elapsed())
            .await;
        return with_request_id(resp, &request_id);
    }

    if evaluate_flag(&state, FlagKey::EnableDisasterMode, "user").await {
        let resp = outage_response(&state, "user", &request_id).await;
        state
            .metrics
            .observe_request(route, StatusCode::INTERNAL_SERVER_ERROR, started.elapsed())
            .await;
        return with_request_id(resp, &request_id);
    }

    let prefix = if evaluate_flag(&state, FlagKey::CheckoutV2, "user").await {
        "cv2"
    } else {
        "chk"
    };
    let confirmation_id = format!("{prefix}-{}", uuid::Uuid::new_v4().simple());
    tracing::info!(user_id = %user_id, confirmation_id = %confirmation_id, amount_cents = req.amount_cents, "checkout simulated");
    let resp = Json(CheckoutResponse {
        confirmation_id,
        status: "succeeded".to_string(),
    })
    .into_response();
    state
        .metrics
        .observe_request(route, StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

/// Demo card validation: Luhn check plus basic expiry and cvc shape.
fn validate_card(req: &CheckoutRequest) -> Result<(), &'static str> {
    let digits: Vec<u32> = req
        .card_number
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_digit(10).ok_or("card number must contain only digits"))
        .collect::<Result<_, _>>()?;
    if !(12..=19).contains(&digits.len()) {
        return Err("card number length is invalid");
    }
    if !luhn_valid(&digits) {
        return Err("card number failed validation");
    }
    if !(1..=12).contains(&req.exp_month) {
        return Err("expiry month must be 1-12");
    }
    if req.exp_year < 2020 {
        return Err("card is expired");
    }
    if !(req.cvc.len() == 3 || req.cvc.len() == 4) || !req.cvc.chars().all(|c| c.is_ascii_digit()) {
        return Err("cvc must be 3 or 4 digits");
    }
    if req.amount_cents == 0 {
        return Err("amount must be positive");
    }
    Ok(())
}

fn luhn_valid(digits: &[u32]) -> bool {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(number: &str) -> CheckoutRequest {
        CheckoutRequest {
            card_number: number.to_string(),
            exp_month: 12,
            exp_year: 2030,
            cvc: "123".to_string(),
            amount_cents: 1999,
        }
    }

    #[test]
    fn the_stripe_test_card_passes_luhn() {
        assert!(validate_card(&card("4242424242424242")).is_ok());
        assert!(validate_card(&card("4242 4242 4242 4242")).is_ok());
    }

    #[test]
    fn invalid_cards_are_rejected_with_a_reason() {
        assert!(validate_card(&card("4242424242424241")).is_err());
        assert!(validate_card(&card("not-a-card")).is_err());
        assert!(validate_card(&card("42")).is_err());

        let mut bad_month = card("4242424242424242");
        bad_month.exp_month = 13;
        assert!(validate_card(&bad_month).is_err());

        let mut bad_cvc = card("4242424242424242");
        bad_cvc.cvc = "12".to_string();
        assert!(validate_card(&bad_cvc).is_err());

        let mut free = card("4242424242424242");
        free.amount_cents = 0;
        assert!(validate_card(&free).is_err());
    }
}
