//! Service level metrics, exported by the Prometheus recorder installed
//! in `main`. HTTP request metrics come from `service_core`.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

pub const DB_QUERY_DURATION: &str = "db_query_duration_seconds";
pub const POLICY_DECISIONS_TOTAL: &str = "policy_decisions_total";
pub const LOGIN_ATTEMPTS_TOTAL: &str = "login_attempts_total";
pub const REGISTRATIONS_TOTAL: &str = "registrations_total";
pub const SUMMARIZER_RUNS_TOTAL: &str = "summarizer_runs_total";

/// Install the global Prometheus recorder.
pub fn init_metrics() -> Result<PrometheusHandle, anyhow::Error> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))
}

/// Times one store query from `started` until now.
pub fn observe_query(query: &'static str, started: Instant) {
    metrics::histogram!(DB_QUERY_DURATION, "query" => query)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_policy_decision(rule: &'static str, allowed: bool) {
    let decision = if allowed { "allow" } else { "deny" };
    metrics::counter!(POLICY_DECISIONS_TOTAL, "rule" => rule, "decision" => decision)
        .increment(1);
}

pub fn record_login(outcome: &'static str) {
    metrics::counter!(LOGIN_ATTEMPTS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_registration(outcome: &'static str) {
    metrics::counter!(REGISTRATIONS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_summarizer_run(outcome: &'static str) {
    metrics::counter!(SUMMARIZER_RUNS_TOTAL, "outcome" => outcome).increment(1);
}
