#![forbid(unsafe_code)]

use std::env;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vitrine_model::FlagSet;
use vitrine_server::{
    build_router, validate_startup_config_contract, ApiConfig, AppState, BrandingStore,
};

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_u64(name, default_ms))
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name).ok().unwrap_or_else(|| default.to_string())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("VITRINE_LOG_JSON", false) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn config_from_env(bind_addr: &str) -> ApiConfig {
    let defaults = ApiConfig::default();
    ApiConfig {
        max_body_bytes: env_usize("VITRINE_MAX_BODY_BYTES", defaults.max_body_bytes),
        upstream_timeout: env_duration_ms("VITRINE_UPSTREAM_TIMEOUT_MS", 5_000),
        token_secret: env_string("VITRINE_TOKEN_SECRET", &defaults.token_secret),
        token_ttl: env_duration_ms("VITRINE_TOKEN_TTL_MS", 30 * 60 * 1_000),
        public_base_url: env_string(
            "VITRINE_PUBLIC_BASE_URL",
            &format!("http://{bind_addr}"),
        ),
        logo_search_url: env_string("VITRINE_LOGO_SEARCH_URL", &defaults.logo_search_url),
        logo_image_base_url: env_string(
            "VITRINE_LOGO_IMAGE_BASE_URL",
            &defaults.logo_image_base_url,
        ),
        logo_secret_key: env::var("VITRINE_LOGO_SECRET_KEY").ok(),
        logo_public_key: env::var("VITRINE_LOGO_PUBLIC_KEY").ok(),
        sim_think_base_ms: env_u64("VITRINE_SIM_THINK_BASE_MS", defaults.sim_think_base_ms),
        sim_run_budget: env_duration_ms("VITRINE_SIM_RUN_BUDGET_MS", 120_000),
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let sigterm = signal(SignalKind::terminate());
        let sigint = signal(SignalKind::interrupt());
        match (sigterm, sigint) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();

    let bind_addr = env_string("VITRINE_BIND_ADDR", "127.0.0.1:8000");
    let api = config_from_env(&bind_addr);
    validate_startup_config_contract(&api)?;

    let branding_path = PathBuf::from(env_string(
        "VITRINE_BRANDING_PATH",
        "data/branding.json",
    ));
    let branding = Arc::new(BrandingStore::load_initial(branding_path));
    let flags = FlagSet::from_lookup(|var| env::var(var).ok());
    info!(
        release_new_auth = flags.release_new_auth,
        enable_disaster_mode = flags.enable_disaster_mode,
        checkout_v2 = flags.checkout_v2,
        "feature flags seeded from environment"
    );

    let state = AppState::new(api, flags, branding);
    let app = build_router(state.clone());

    let addr: std::net::SocketAddr = bind_addr
        .parse()
        .map_err(|e| format!("invalid bind addr {bind_addr}: {e}"))?;
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4().map_err(|e| format!("socket v4 failed: {e}"))?
    } else {
        tokio::net::TcpSocket::new_v6().map_err(|e| format!("socket v6 failed: {e}"))?
    };
    socket
        .set_reuseaddr(true)
        .map_err(|e| format!("set_reuseaddr failed: {e}"))?;
    socket.bind(addr).map_err(|e| format!("bind failed: {e}"))?;
    let listener: TcpListener = socket
        .listen(1024)
        .map_err(|e| format!("listen failed: {e}"))?;
    info!("vitrine-server listening on {bind_addr}");

    let accepting = state.accepting_requests.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            accepting.store(false, Ordering::Relaxed);
            let drain_ms = env_u64("VITRINE_SHUTDOWN_DRAIN_MS", 2_000);
            tokio::time::sleep(Duration::from_millis(drain_ms)).await;
        })
        .await
        .map_err(|e| format!("server failed: {e}"))
}
