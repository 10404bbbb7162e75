//! Scripted traffic runs against the server's own public base URL.
//!
//! A run drives the same HTTP surface a human visitor would touch: apply the
//! requested branding, browse the shell pages, sign up and log in, edit the
//! profile, pay, and poke a few known-bad requests. Each run is capped by a
//! wall-clock budget; hitting the budget ends the run as a success with a
//! transcript note rather than an error.

use rand::Rng;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;
use vitrine_api::RunStatusResponse;
use vitrine_model::BrandingInput;

use crate::config::ApiConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Running,
    Success,
    Error,
}

impl RunState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Pending => "pending",
            RunState::Running => "running",
            RunState::Success => "success",
            RunState::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub state: RunState,
    pub error: Option<String>,
    pub transcript: Vec<String>,
}

impl RunRecord {
    #[must_use]
    pub fn to_status(&self) -> RunStatusResponse {
        RunStatusResponse {
            run_id: self.run_id,
            status: self.state.as_str().to_string(),
            error: self.error.clone(),
            output: if self.transcript.is_empty() {
                None
            } else {
                Some(self.transcript.join("\n"))
            },
        }
    }
}

#[derive(Default)]
pub struct RunRegistry {
    runs: Mutex<HashMap<Uuid, RunRecord>>,
}

impl RunRegistry {
    pub fn insert_pending(&self) -> Uuid {
        let run_id = Uuid::new_v4();
        if let Ok(mut runs) = self.runs.lock() {
            runs.insert(
                run_id,
                RunRecord {
                    run_id,
                    state: RunState::Pending,
                    error: None,
                    transcript: Vec::new(),
                },
            );
        }
        run_id
    }

    pub fn set_running(&self, run_id: Uuid) {
        if let Ok(mut runs) = self.runs.lock() {
            if let Some(record) = runs.get_mut(&run_id) {
                record.state = RunState::Running;
            }
        }
    }

    pub fn finish_success(&self, run_id: Uuid, transcript: Vec<String>) {
        if let Ok(mut runs) = self.runs.lock() {
            if let Some(record) = runs.get_mut(&run_id) {
                record.state = RunState::Success;
                record.error = None;
                record.transcript = transcript;
            }
        }
    }

    pub fn finish_error(&self, run_id: Uuid, message: String, transcript: Vec<String>) {
        if let Ok(mut runs) = self.runs.lock() {
            if let Some(record) = runs.get_mut(&run_id) {
                record.state = RunState::Error;
                record.error = Some(message);
                record.transcript = transcript;
            }
        }
    }

    #[must_use]
    pub fn get(&self, run_id: Uuid) -> Option<RunRecord> {
        self.runs
            .lock()
            .ok()
            .and_then(|runs| runs.get(&run_id).cloned())
    }
}

/// Everything a run needs, captured before the background task starts.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub base_url: String,
    pub branding: BrandingInput,
    pub think_base: Duration,
    pub budget: Duration,
}

impl SimulationPlan {
    #[must_use]
    pub fn from_config(api: &ApiConfig, branding: BrandingInput) -> Self {
        Self {
            base_url: api.public_base_url.trim_end_matches('/').to_string(),
            branding,
            think_base: Duration::from_millis(api.sim_think_base_ms),
            budget: api.sim_run_budget,
        }
    }
}

pub async fn execute_run(registry: std::sync::Arc<RunRegistry>, run_id: Uuid, plan: SimulationPlan) {
    registry.set_running(run_id);
    tracing::info!(run_id = %run_id, base_url = %plan.base_url, "simulation run started");

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            registry.finish_error(run_id, format!("http client: {err}"), Vec::new());
            return;
        }
    };

    let mut transcript = Vec::new();
    match timeout(plan.budget, run_flows(&client, &plan, &mut transcript)).await {
        Ok(Ok(())) => {
            tracing::info!(run_id = %run_id, steps = transcript.len(), "simulation run finished");
            registry.finish_success(run_id, transcript);
        }
        Ok(Err(message)) => {
            tracing::warn!(run_id = %run_id, error = %message, "simulation run failed");
            registry.finish_error(run_id, message, transcript);
        }
        Err(_) => {
            transcript.push(format!(
                "run budget of {}s reached, ending run",
                plan.budget.as_secs()
            ));
            tracing::info!(run_id = %run_id, "simulation run hit its budget");
            registry.finish_success(run_id, transcript);
        }
    }
}

async fn run_flows(
    client: &reqwest::Client,
    plan: &SimulationPlan,
    transcript: &mut Vec<String>,
) -> Result<(), String> {
    apply_branding_flow(client, plan, transcript).await?;
    visitor_browse_flow(client, plan, transcript).await?;
    let token = signup_and_profile_flow(client, plan, transcript).await?;
    checkout_flow(client, plan, &token, transcript).await?;
    error_injection_flow(client, plan, transcript).await?;
    Ok(())
}

async fn apply_branding_flow(
    client: &reqwest::Client,
    plan: &SimulationPlan,
    transcript: &mut Vec<String>,
) -> Result<(), String> {
    let url = format!("{}/api/branding", plan.base_url);
    let response = client
        .post(&url)
        .json(&plan.branding)
        .send()
        .await
        .map_err(|e| format!("apply branding: {e}"))?;
    expect_status(&response, 200, "apply branding")?;
    transcript.push("applied branding".to_string());
    think(plan.think_base).await;
    Ok(())
}

async fn visitor_browse_flow(
    client: &reqwest::Client,
    plan: &SimulationPlan,
    transcript: &mut Vec<String>,
) -> Result<(), String> {
    for path in ["/", "/pricing", "/api/branding"] {
        let url = format!("{}{path}", plan.base_url);
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("browse {path}: {e}"))?;
        expect_status(&response, 200, path)?;
        transcript.push(format!("visited {path}"));
        think(plan.think_base).await;
    }
    Ok(())
}

async fn signup_and_profile_flow(
    client: &reqwest::Client,
    plan: &SimulationPlan,
    transcript: &mut Vec<String>,
) -> Result<String, String> {
    let email = format!("sim-{}@vitrine.example", Uuid::new_v4().simple());
    let password = "sim-password-1";

    let response = client
        .post(format!("{}/api/signup", plan.base_url))
        .json(&json!({"email": email, "password": password}))
        .send()
        .await
        .map_err(|e| format!("signup: {e}"))?;
    expect_status(&response, 200, "signup")?;
    transcript.push(format!("signed up as {email}"));
    think(plan.think_base).await;

    let response = client
        .post(format!("{}/api/token", plan.base_url))
        .form(&[("username", email.as_str()), ("password", password)])
        .send()
        .await
        .map_err(|e| format!("token: {e}"))?;
    expect_status(&response, 200, "token")?;
    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| format!("token body: {e}"))?;
    let token = body
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "token response missing access_token".to_string())?
        .to_string();
    transcript.push("logged in".to_string());
    think(plan.think_base).await;

    let response = client
        .get(format!("{}/api/me", plan.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .map_err(|e| format!("me: {e}"))?;
    expect_status(&response, 200, "me")?;
    transcript.push("viewed profile".to_string());
    think(plan.think_base).await;

    let response = client
        .patch(format!("{}/api/me", plan.base_url))
        .bearer_auth(&token)
        .json(&json!({"full_name": "Sim Visitor", "website": "https://vitrine.example"}))
        .send()
        .await
        .map_err(|e| format!("profile update: {e}"))?;
    expect_status(&response, 200, "profile update")?;
    transcript.push("updated profile".to_string());
    think(plan.think_base).await;

    Ok(token)
}

async fn checkout_flow(
    client: &reqwest::Client,
    plan: &SimulationPlan,
    token: &str,
    transcript: &mut Vec<String>,
) -> Result<(), String> {
    let response = client
        .post(format!("{}/api/checkout", plan.base_url))
        .bearer_auth(token)
        .json(&json!({
            "card_number": "4242424242424242",
            "exp_month": 12,
            "exp_year": 2030,
            "cvc": "123",
            "amount_cents": 1999,
        }))
        .send()
        .await
        .map_err(|e| format!("checkout: {e}"))?;
    expect_status(&response, 200, "checkout")?;
    transcript.push("completed checkout".to_string());
    think(plan.think_base).await;
    Ok(())
}

/// Requests that are supposed to fail; a 2xx here means the server's error
/// paths regressed.
async fn error_injection_flow(
    client: &reqwest::Client,
    plan: &SimulationPlan,
    transcript: &mut Vec<String>,
) -> Result<(), String> {
    let response = client
        .post(format!("{}/api/token", plan.base_url))
        .form(&[("username", "nobody@vitrine.example"), ("password", "wrong")])
        .send()
        .await
        .map_err(|e| format!("bad login: {e}"))?;
    expect_status(&response, 401, "bad login")?;
    transcript.push("bad login rejected".to_string());
    think(plan.think_base).await;

    let response = client
        .post(format!("{}/api/signup", plan.base_url))
        .json(&json!({"email": "   ", "password": "x"}))
        .send()
        .await
        .map_err(|e| format!("bad signup: {e}"))?;
    expect_status(&response, 400, "bad signup")?;
    transcript.push("bad signup rejected".to_string());
    think(plan.think_base).await;

    let response = client
        .get(format!("{}/api/runs/{}", plan.base_url, Uuid::new_v4()))
        .send()
        .await
        .map_err(|e| format!("unknown run: {e}"))?;
    expect_status(&response, 404, "unknown run")?;
    transcript.push("unknown run reported missing".to_string());
    Ok(())
}

fn expect_status(response: &reqwest::Response, expected: u16, step: &str) -> Result<(), String> {
    let got = response.status().as_u16();
    if got == expected {
        Ok(())
    } else {
        Err(format!("{step}: expected status {expected}, got {got}"))
    }
}

/// Sleeps a jittered interval around the configured think time. The RNG is
/// scoped so the surrounding future stays `Send`.
async fn think(base: Duration) {
    let base_ms = base.as_millis() as u64;
    if base_ms == 0 {
        return;
    }
    let jitter_ms = {
        let mut rng = rand::thread_rng();
        rng.gen_range(base_ms / 2..=base_ms.saturating_mul(3) / 2)
    };
    tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_tracks_the_run_lifecycle() {
        let registry = RunRegistry::default();
        let run_id = registry.insert_pending();
        assert_eq!(registry.get(run_id).unwrap().state, RunState::Pending);

        registry.set_running(run_id);
        assert_eq!(registry.get(run_id).unwrap().state, RunState::Running);

        registry.finish_success(run_id, vec!["visited /".to_string()]);
        let record = registry.get(run_id).unwrap();
        assert_eq!(record.state, RunState::Success);
        assert_eq!(record.to_status().output.as_deref(), Some("visited /"));
        assert!(record.to_status().error.is_none());
    }

    #[test]
    fn registry_records_failures_with_partial_transcript() {
        let registry = RunRegistry::default();
        let run_id = registry.insert_pending();
        registry.finish_error(
            run_id,
            "checkout: expected status 200, got 500".to_string(),
            vec!["visited /".to_string(), "signed up".to_string()],
        );
        let status = registry.get(run_id).unwrap().to_status();
        assert_eq!(status.status, "error");
        assert!(status.error.unwrap().contains("checkout"));
        assert!(status.output.unwrap().contains("signed up"));
    }

    #[test]
    fn unknown_runs_are_absent() {
        assert!(RunRegistry::default().get(Uuid::new_v4()).is_none());
    }

    #[tokio::test]
    async fn zero_think_time_does_not_sleep() {
        tokio::time::timeout(Duration::from_millis(50), think(Duration::ZERO))
            .await
            .expect("no sleep");
    }
}
