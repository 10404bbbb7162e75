#![forbid(unsafe_code)]

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use vitrine_model::FlagSet;

mod auth;
mod brands;
mod config;
mod http;
mod simulate;
mod store;
mod telemetry;

pub const CRATE_NAME: &str = "vitrine-server";

pub use brands::{
    dominant_color_hex, BrandClient, BrandError, FakeLogoUpstream, FetchedImage, HttpLogoUpstream,
    LogoUpstream, UpstreamBrand, DEFAULT_BRAND_COLOR,
};
pub use config::{validate_startup_config_contract, ApiConfig};
pub use simulate::{RunRecord, RunRegistry, RunState, SimulationPlan};
pub use store::branding::BrandingStore;
pub use store::users::{UserStore, UserStoreError};

use telemetry::RequestMetrics;

#[derive(Clone)]
pub struct AppState {
    pub api: ApiConfig,
    pub flags: FlagSet,
    pub users: Arc<UserStore>,
    pub branding: Arc<BrandingStore>,
    pub runs: Arc<RunRegistry>,
    pub brands: Arc<BrandClient>,
    pub ready: Arc<AtomicBool>,
    pub accepting_requests: Arc<AtomicBool>,
    pub(crate) metrics: Arc<RequestMetrics>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(api: ApiConfig, flags: FlagSet, branding: Arc<BrandingStore>) -> Self {
        let upstream: Arc<dyn LogoUpstream> = Arc::new(HttpLogoUpstream::from_config(&api));
        Self::with_upstream(api, flags, branding, upstream)
    }

    #[must_use]
    pub fn with_upstream(
        api: ApiConfig,
        flags: FlagSet,
        branding: Arc<BrandingStore>,
        upstream: Arc<dyn LogoUpstream>,
    ) -> Self {
        Self {
            brands: Arc::new(BrandClient::new(upstream, &api)),
            api,
            flags,
            users: Arc::new(UserStore::new()),
            branding,
            runs: Arc::new(RunRegistry::default()),
            ready: Arc::new(AtomicBool::new(true)),
            accepting_requests: Arc::new(AtomicBool::new(true)),
            metrics: Arc::new(RequestMetrics::default()),
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(http::shell::shell_handler))
        .route("/pricing", get(http::shell::pricing_handler))
        .route("/static/logo.svg", get(http::shell::default_logo_handler))
        .route("/healthz", get(http::ops::healthz_handler))
        .route("/readyz", get(http::ops::readyz_handler))
        .route("/metrics", get(http::ops::metrics_handler))
        .route("/v1/version", get(http::ops::version_handler))
        .route("/api/signup", post(http::auth::signup_handler))
        .route("/api/token", post(http::auth::token_handler))
        .route(
            "/api/me",
            get(http::auth::me_handler).patch(http::auth::update_me_handler),
        )
        .route("/api/checkout", post(http::auth::checkout_handler))
        .route(
            "/api/branding",
            get(http::branding::get_branding_handler).post(http::branding::apply_branding_handler),
        )
        .route("/api/search-brands", get(http::brands::search_brands_handler))
        .route("/api/proxy-image", get(http::brands::proxy_image_handler))
        .route("/api/runs", post(http::runs::trigger_run_handler))
        .route("/api/runs/:run_id", get(http::runs::run_status_handler))
        .layer(DefaultBodyLimit::max(state.api.max_body_bytes))
        .with_state(state)
}
