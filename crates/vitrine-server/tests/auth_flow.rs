use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::tempdir;
use vitrine_model::FlagSet;
use vitrine_server::{build_router, ApiConfig, AppState, BrandingStore, FakeLogoUpstream};

async fn spawn_server(flags: FlagSet) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");

    let dir = tempdir().expect("tempdir");
    let branding = Arc::new(BrandingStore::load_initial(dir.path().join("branding.json")));
    let api = ApiConfig {
        public_base_url: format!("http://{addr}"),
        sim_think_base_ms: 0,
        sim_run_budget: Duration::from_secs(10),
        ..ApiConfig::default()
    };
    let state = AppState::with_upstream(api, flags, branding, Arc::new(FakeLogoUpstream::default()));
    let app = build_router(state);
    tokio::spawn(async move {
        let _dir = dir;
        axum::serve(listener, app).await.expect("serve app");
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn signup_login_profile_and_checkout_flow() {
    let base = spawn_server(FlagSet::default()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/signup"))
        .json(&json!({"email": "Ada@Example.com", "password": "s3cret"}))
        .send()
        .await
        .expect("signup");
    assert_eq!(resp.status(), 200);
    let user: Value = resp.json().await.expect("signup body");
    assert_eq!(user["email"], "ada@example.com");
    assert!(user.get("password_hash").is_none());

    let resp = client
        .post(format!("{base}/api/token"))
        .form(&[("username", "ada@example.com"), ("password", "s3cret")])
        .send()
        .await
        .expect("token");
    assert_eq!(resp.status(), 200);
    let token_body: Value = resp.json().await.expect("token body");
    assert_eq!(token_body["token_type"], "bearer");
    let token = token_body["access_token"].as_str().expect("token").to_string();

    let resp = client
        .get(format!("{base}/api/me"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("me");
    assert_eq!(resp.status(), 200);
    let me: Value = resp.json().await.expect("me body");
    assert_eq!(me["email"], "ada@example.com");
    assert!(me["full_name"].is_null());

    let resp = client
        .patch(format!("{base}/api/me"))
        .bearer_auth(&token)
        .json(&json!({"full_name": "Ada Lovelace", "website": "https://ada.example"}))
        .send()
        .await
        .expect("patch me");
    assert_eq!(resp.status(), 200);
    let me: Value = resp.json().await.expect("patch body");
    assert_eq!(me["full_name"], "Ada Lovelace");
    assert_eq!(me["website"], "https://ada.example");
    assert!(me["username"].is_null(), "absent fields stay untouched");

    let resp = client
        .post(format!("{base}/api/checkout"))
        .bearer_auth(&token)
        .json(&json!({
            "card_number": "4242424242424242",
            "exp_month": 12,
            "exp_year": 2030,
            "cvc": "123",
            "amount_cents": 1999,
        }))
        .send()
        .await
        .expect("checkout");
    assert_eq!(resp.status(), 200);
    let receipt: Value = resp.json().await.expect("checkout body");
    assert_eq!(receipt["status"], "succeeded");
    assert!(receipt["confirmation_id"]
        .as_str()
        .expect("confirmation")
        .starts_with("chk-"));
}

#[tokio::test]
async fn duplicate_signup_is_a_400_with_a_stable_code() {
    let base = spawn_server(FlagSet::default()).await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let _ = client
            .post(format!("{base}/api/signup"))
            .json(&json!({"email": "dup@example.com", "password": "pw"}))
            .send()
            .await
            .expect("signup");
    }
    let resp = client
        .post(format!("{base}/api/signup"))
        .json(&json!({"email": "dup@example.com", "password": "pw"}))
        .send()
        .await
        .expect("signup again");
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.expect("error body");
    assert_eq!(body["error"]["code"], "email_already_registered");
    assert_eq!(body["error"]["message"], "Email already registered");
}

#[tokio::test]
async fn bad_credentials_get_a_challenge_header() {
    let base = spawn_server(FlagSet::default()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/token"))
        .form(&[("username", "nobody@example.com"), ("password", "x")])
        .send()
        .await
        .expect("token");
    assert_eq!(resp.status(), 401);
    assert_eq!(
        resp.headers()
            .get("www-authenticate")
            .and_then(|v| v.to_str().ok()),
        Some("Bearer")
    );
    let body: Value = resp.json().await.expect("error body");
    assert_eq!(body["error"]["code"], "invalid_credentials");
}

#[tokio::test]
async fn protected_routes_reject_missing_tokens() {
    let base = spawn_server(FlagSet::default()).await;
    let client = reqwest::Client::new();

    for req in [
        client.get(format!("{base}/api/me")),
        client.patch(format!("{base}/api/me")).json(&json!({})),
        client
            .post(format!("{base}/api/checkout"))
            .json(&json!({"card_number": "4242424242424242", "exp_month": 1, "exp_year": 2030, "cvc": "123", "amount_cents": 1})),
    ] {
        let resp = req.send().await.expect("request");
        assert_eq!(resp.status(), 401);
    }
}

#[tokio::test]
async fn disaster_mode_fails_signup_after_the_duplicate_check() {
    let flags = FlagSet {
        enable_disaster_mode: true,
        ..FlagSet::default()
    };
    let base = spawn_server(flags).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/signup"))
        .json(&json!({"email": "victim@example.com", "password": "pw"}))
        .send()
        .await
        .expect("signup");
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.expect("error body");
    assert_eq!(
        body["error"]["message"],
        "Service temporarily unavailable. Please try again later."
    );

    // Bad input still wins over the outage: validation runs first.
    let resp = client
        .post(format!("{base}/api/signup"))
        .json(&json!({"email": "not-an-email", "password": "pw"}))
        .send()
        .await
        .expect("bad signup");
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn disaster_mode_fails_login_only_for_known_users() {
    let flags = FlagSet {
        release_new_auth: true,
        ..FlagSet::default()
    };
    let base = spawn_server(flags).await;
    let client = reqwest::Client::new();

    // Unknown users still get the normal 401, not the outage.
    let resp = client
        .post(format!("{base}/api/token"))
        .form(&[("username", "ghost@example.com"), ("password", "x")])
        .send()
        .await
        .expect("token");
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn checkout_v2_changes_the_confirmation_prefix() {
    let flags = FlagSet {
        checkout_v2: true,
        ..FlagSet::default()
    };
    let base = spawn_server(flags).await;
    let client = reqwest::Client::new();

    let _ = client
        .post(format!("{base}/api/signup"))
        .json(&json!({"email": "buyer@example.com", "password": "pw"}))
        .send()
        .await
        .expect("signup");
    let token_body: Value = client
        .post(format!("{base}/api/token"))
        .form(&[("username", "buyer@example.com"), ("password", "pw")])
        .send()
        .await
        .expect("token")
        .json()
        .await
        .expect("token body");
    let token = token_body["access_token"].as_str().expect("token");

    let receipt: Value = client
        .post(format!("{base}/api/checkout"))
        .bearer_auth(token)
        .json(&json!({
            "card_number": "4242424242424242",
            "exp_month": 6,
            "exp_year": 2031,
            "cvc": "9999",
            "amount_cents": 500,
        }))
        .send()
        .await
        .expect("checkout")
        .json()
        .await
        .expect("checkout body");
    assert!(receipt["confirmation_id"]
        .as_str()
        .expect("confirmation")
        .starts_with("cv2-"));
}

#[tokio::test]
async fn declined_cards_are_rejected_before_any_charge() {
    let base = spawn_server(FlagSet::default()).await;
    let client = reqwest::Client::new();

    let _ = client
        .post(format!("{base}/api/signup"))
        .json(&json!({"email": "fraud@example.com", "password": "pw"}))
        .send()
        .await
        .expect("signup");
    let token_body: Value = client
        .post(format!("{base}/api/token"))
        .form(&[("username", "fraud@example.com"), ("password", "pw")])
        .send()
        .await
        .expect("token")
        .json()
        .await
        .expect("token body");
    let token = token_body["access_token"].as_str().expect("token");

    let resp = client
        .post(format!("{base}/api/checkout"))
        .bearer_auth(token)
        .json(&json!({
            "card_number": "4242424242424241",
            "exp_month": 12,
            "exp_year": 2030,
            "cvc": "123",
            "amount_cents": 100,
        }))
        .send()
        .await
        .expect("checkout");
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.expect("error body");
    assert_eq!(body["error"]["code"], "payment_rejected");
}
