//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use regex::Regex;

use super::config::MetricsConfig;

static CHAIN_ID_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\d{10,}-[0-9A-Za-z]+(/|$)").expect("valid chain id pattern"));
static CHAIN_ENDPOINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/api/chains/[^/]+/\d+/").expect("valid endpoint pattern"));
static SLUG_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/api/chain-direct/[^/]+").expect("valid slug pattern"));
static USER_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/api/users/[^/]+/").expect("valid user pattern"));

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("chainport_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!(path = %config.path, "Prometheus metrics initialized");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize Prometheus metrics");
            None
        }
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Record one executed chain step
pub fn record_chain_step(success: bool, duration: Duration) {
    let status = if success { "success" } else { "error" };

    counter!("chain_steps_total", "status" => status).increment(1);
    histogram!("chain_step_duration_seconds", "status" => status).record(duration.as_secs_f64());
}

/// Record a finished chain run
pub fn record_chain_run(outcome: &'static str, steps_completed: usize, duration: Duration) {
    counter!("chain_runs_total", "outcome" => outcome).increment(1);
    histogram!("chain_run_duration_seconds", "outcome" => outcome).record(duration.as_secs_f64());
    histogram!("chain_run_steps_completed").record(steps_completed as f64);
}

/// Record a chain creation and where it was persisted
pub fn record_chain_created(durable: bool) {
    let persistence = if durable { "durable" } else { "memory_only" };
    counter!("chains_created_total", "persistence" => persistence).increment(1);
}

/// Collapse chain ids, user names, ports and slugs so label cardinality stays bounded
fn sanitize_path(path: &str) -> String {
    let path = CHAIN_ENDPOINT.replace(path, "/api/chains/{user}/{port}/");
    let path = SLUG_SEGMENT.replace(&path, "/api/chain-direct/{slug}");
    let path = USER_SEGMENT.replace(&path, "/api/users/{owner}/");
    let path = CHAIN_ID_SEGMENT.replace_all(&path, "/{id}$1");

    if path.len() > 60 {
        path[..60].to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_process_path() {
        assert_eq!(
            sanitize_path("/api/process/1700000000000-abcd1234"),
            "/api/process/{id}"
        );
    }

    #[test]
    fn test_sanitize_chain_endpoint() {
        assert_eq!(
            sanitize_path("/api/chains/janedoe/4821/1700000000000-abcd1234"),
            "/api/chains/{user}/{port}/{id}"
        );
        assert_eq!(sanitize_path("/api/chains"), "/api/chains");
    }

    #[test]
    fn test_sanitize_slug_and_owner() {
        assert_eq!(sanitize_path("/api/chain-direct/abcd"), "/api/chain-direct/{slug}");
        assert_eq!(sanitize_path("/api/users/u-42/chains"), "/api/users/{owner}/chains");
    }

    #[test]
    fn test_sanitize_no_id() {
        assert_eq!(sanitize_path("/health"), "/health");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_chain_step(true, Duration::from_millis(10));
        record_chain_run("completed", 3, Duration::from_millis(30));
        record_chain_created(false);
    }
}
