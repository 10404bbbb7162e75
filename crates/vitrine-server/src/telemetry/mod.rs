use axum::http::StatusCode;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::Mutex;

const METRIC_SUBSYSTEM: &str = "vitrine";
const METRIC_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Default)]
pub(crate) struct RequestMetrics {
    counts: Mutex<HashMap<(String, u16), u64>>,
    latency_ns: Mutex<HashMap<String, Vec<u64>>>,
    events: Mutex<HashMap<(String, String), u64>>,
}

impl RequestMetrics {
    pub(crate) async fn observe_request(&self, route: &str, status: StatusCode, latency: Duration) {
        let mut counts = self.counts.lock().await;
        *counts
            .entry((route.to_string(), status.as_u16()))
            .or_insert(0) += 1;
        drop(counts);
        let mut latency_map = self.latency_ns.lock().await;
        latency_map
            .entry(route.to_string())
            .or_insert_with(Vec::new)
            .push(latency.as_nanos() as u64);
    }

    /// Counts a tracked event (e.g. `http.500`) per evaluation context kind.
    pub(crate) async fn track_event(&self, event: &str, context_kind: &str) {
        let mut events = self.events.lock().await;
        *events
            .entry((event.to_string(), context_kind.to_string()))
            .or_insert(0) += 1;
    }

    pub(crate) async fn render_prometheus(&self) -> String {
        let mut body = String::new();

        let counts = self.counts.lock().await;
        let ordered: BTreeMap<_, _> = counts.iter().collect();
        for ((route, status), count) in ordered {
            body.push_str(&format!(
                "vitrine_requests_total{{subsystem=\"{METRIC_SUBSYSTEM}\",version=\"{METRIC_VERSION}\",route=\"{route}\",status=\"{status}\"}} {count}\n",
            ));
        }
        drop(counts);

        let latency = self.latency_ns.lock().await;
        let ordered: BTreeMap<_, _> = latency.iter().collect();
        for (route, samples) in ordered {
            body.push_str(&format!(
                "vitrine_request_latency_p95_ns{{subsystem=\"{METRIC_SUBSYSTEM}\",version=\"{METRIC_VERSION}\",route=\"{route}\"}} {}\n",
                percentile_ns(samples, 0.95)
            ));
        }
        drop(latency);

        let events = self.events.lock().await;
        let ordered: BTreeMap<_, _> = events.iter().collect();
        for ((event, context_kind), count) in ordered {
            body.push_str(&format!(
                "vitrine_events_total{{subsystem=\"{METRIC_SUBSYSTEM}\",version=\"{METRIC_VERSION}\",event=\"{event}\",context=\"{context_kind}\"}} {count}\n",
            ));
        }

        body
    }
}

fn percentile_ns(values: &[u64], pct: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let mut v = values.to_vec();
    v.sort_unstable();
    let idx = ((v.len() as f64 - 1.0) * pct).round() as usize;
    v[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_of_empty_is_zero() {
        assert_eq!(percentile_ns(&[], 0.95), 0);
    }

    #[test]
    fn percentile_picks_upper_tail() {
        let samples: Vec<u64> = (1..=100).collect();
        assert_eq!(percentile_ns(&samples, 0.95), 95);
        assert_eq!(percentile_ns(&samples, 0.0), 1);
    }

    #[tokio::test]
    async fn rendered_metrics_include_counts_and_events() {
        let metrics = RequestMetrics::default();
        metrics
            .observe_request("/api/signup", StatusCode::OK, Duration::from_millis(3))
            .await;
        metrics.track_event("http.500", "anonymous").await;
        let body = metrics.render_prometheus().await;
        assert!(body.contains("vitrine_requests_total"));
        assert!(body.contains("route=\"/api/signup\",status=\"200\"} 1"));
        assert!(body.contains("event=\"http.500\",context=\"anonymous\"} 1"));
    }
}
