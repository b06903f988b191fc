//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Workflow runs and their outcome
//! - Tracker polling (change review, build listing, single build)
//! - External services (GitHub, CircleCI, ServiceNow)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Workflow
// =============================================================================

/// Workflow runs total by result.
pub static WORKFLOW_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("rdsprov_workflow_runs_total", "Total provisioning workflow runs"),
        &["result"], // "provisioned", "not_merged", "job_failed", "timeout", ...
    )
    .unwrap()
});

/// Workflow duration in seconds.
pub static WORKFLOW_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "rdsprov_workflow_duration_seconds",
            "Duration of a provisioning workflow run",
        )
        .buckets(vec![10.0, 60.0, 300.0, 900.0, 1800.0, 3600.0, 7200.0, 14400.0]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Trackers
// =============================================================================

/// Polls issued by the trackers.
pub static TRACKER_POLLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("rdsprov_tracker_polls_total", "Total tracker polls"),
        &["tracker"], // "change_review", "build_list", "build"
    )
    .unwrap()
});

/// Time spent waiting for a tracker to resolve.
pub static TRACKER_WAIT_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "rdsprov_tracker_wait_seconds",
            "Time spent waiting on an external process",
        )
        .buckets(vec![5.0, 30.0, 60.0, 300.0, 900.0, 1800.0, 3600.0, 7200.0]),
        &["tracker", "result"],
    )
    .unwrap()
});

// =============================================================================
// External services
// =============================================================================

/// External service requests by status.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "rdsprov_external_service_requests_total",
            "Total requests to external services",
        ),
        &["service", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Count one request to an external service.
pub fn record_request(service: &str, operation: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    EXTERNAL_SERVICE_REQUESTS
        .with_label_values(&[service, operation, status])
        .inc();
}

/// Count one tracker poll.
pub fn record_poll(tracker: &str) {
    TRACKER_POLLS.with_label_values(&[tracker]).inc();
}

/// Record how long a tracker waited and how it ended.
pub fn record_wait(tracker: &str, result: &str, seconds: f64) {
    TRACKER_WAIT_DURATION
        .with_label_values(&[tracker, result])
        .observe(seconds);
}

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(WORKFLOW_RUNS.clone()),
        Box::new(WORKFLOW_DURATION.clone()),
        Box::new(TRACKER_POLLS.clone()),
        Box::new(TRACKER_WAIT_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        record_request("github", "get_change", true);
        record_poll("build");
        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|f| f.get_name().to_string())
            .collect();
        assert!(names.contains(&"rdsprov_external_service_requests_total".to_string()));
        assert!(names.contains(&"rdsprov_tracker_polls_total".to_string()));
    }
}
