use serde::Serialize;
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: &str = "1";

#[derive(Debug, Clone, Serialize)]
pub struct ApiConfig {
    pub max_body_bytes: usize,
    pub upstream_timeout: Duration,
    pub token_secret: String,
    pub token_ttl: Duration,
    /// Base URL requests can reach this server on; the simulation driver and
    /// proxied logo URLs point here.
    pub public_base_url: String,
    pub logo_search_url: String,
    pub logo_image_base_url: String,
    pub logo_secret_key: Option<String>,
    pub logo_public_key: Option<String>,
    pub sim_think_base_ms: u64,
    pub sim_run_budget: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 16 * 1024,
            upstream_timeout: Duration::from_secs(5),
            token_secret: "insecure-demo-secret-key".to_string(),
            token_ttl: Duration::from_secs(30 * 60),
            public_base_url: "http://127.0.0.1:8000".to_string(),
            logo_search_url: "https://api.logo.dev/search".to_string(),
            logo_image_base_url: "https://img.logo.dev".to_string(),
            logo_secret_key: None,
            logo_public_key: None,
            sim_think_base_ms: 400,
            sim_run_budget: Duration::from_secs(120),
        }
    }
}

pub fn validate_startup_config_contract(api: &ApiConfig) -> Result<(), String> {
    if api.max_body_bytes == 0 {
        return Err("max_body_bytes must be > 0".to_string());
    }
    if api.upstream_timeout.is_zero() {
        return Err("upstream_timeout must be > 0".to_string());
    }
    if api.token_secret.trim().is_empty() {
        return Err("token_secret must not be empty".to_string());
    }
    if api.token_ttl.is_zero() {
        return Err("token_ttl must be > 0".to_string());
    }
    if !(api.public_base_url.starts_with("http://") || api.public_base_url.starts_with("https://"))
    {
        return Err("public_base_url must be an http(s) URL".to_string());
    }
    if api.sim_run_budget.is_zero() {
        return Err("sim_run_budget must be > 0".to_string());
    }
    if api.logo_secret_key.is_some() != api.logo_public_key.is_some() {
        return Err("logo keys must be configured together".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_config_validation_rejects_empty_secret() {
        let api = ApiConfig {
            token_secret: "  ".to_string(),
            ..ApiConfig::default()
        };
        let err = validate_startup_config_contract(&api).expect_err("empty secret");
        assert!(err.contains("token_secret"));
    }

    #[test]
    fn startup_config_validation_requires_paired_logo_keys() {
        let api = ApiConfig {
            logo_secret_key: Some("sk".to_string()),
            logo_public_key: None,
            ..ApiConfig::default()
        };
        let err = validate_startup_config_contract(&api).expect_err("unpaired keys");
        assert!(err.contains("together"));
    }

    #[test]
    fn startup_config_validation_accepts_defaults() {
        validate_startup_config_contract(&ApiConfig::default()).expect("defaults valid");
    }
}
