use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all directory-sync metrics
const PREFIX: &str = "directory_sync";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Platform API Metrics
    pub static ref PLATFORM_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_platform_requests_total"), "Outbound platform API requests"),
        &["endpoint", "status"]
    ).expect("Failed to create platform_requests_total metric");

    // Reconciliation Metrics
    pub static ref RECONCILIATION_LISTINGS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_reconciliation_listings_total"),
            "Listings handled by reconciliation cycles, by outcome"
        ),
        &["outcome"]
    ).expect("Failed to create reconciliation_listings_total metric");

    // Notification Metrics
    pub static ref NOTIFICATION_DELIVERIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_notification_deliveries_total"),
            "Notification deliveries by event kind and delivery tier"
        ),
        &["kind", "tier"]
    ).expect("Failed to create notification_deliveries_total metric");

    // Command Metrics
    pub static ref COMMANDS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_commands_total"), "Command invocations by outcome"),
        &["command", "outcome"]
    ).expect("Failed to create commands_total metric");

    // Background Job Metrics
    pub static ref BACKGROUND_JOB_EXECUTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_background_job_executions_total"),
            "Background job executions by status"
        ),
        &["job", "status"]
    ).expect("Failed to create background_job_executions_total metric");

    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_background_job_duration_seconds"),
            "Background job execution duration in seconds"
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 30.0, 60.0, 300.0, 1800.0]),
        &["job"]
    ).expect("Failed to create background_job_duration_seconds metric");

    pub static ref BACKGROUND_JOB_SKIPPED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_background_job_skipped_total"),
            "Ticks skipped because the previous run was still going"
        ),
        &["job"]
    ).expect("Failed to create background_job_skipped_total metric");

    pub static ref BACKGROUND_JOB_RUNNING: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_background_job_running"), "Whether a job is currently running"),
        &["job"]
    ).expect("Failed to create background_job_running metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(PLATFORM_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(RECONCILIATION_LISTINGS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(NOTIFICATION_DELIVERIES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(COMMANDS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_EXECUTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_SKIPPED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_RUNNING.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record an outbound platform API request
pub fn record_platform_request(endpoint: &str, status: u16) {
    PLATFORM_REQUESTS_TOTAL
        .with_label_values(&[endpoint, &status.to_string()])
        .inc();
}

/// Record the outcome of one reconciliation cycle
pub fn record_reconciliation_cycle(processed: u64, updated: u64, failed: u64) {
    RECONCILIATION_LISTINGS_TOTAL
        .with_label_values(&["processed"])
        .inc_by(processed as f64);
    RECONCILIATION_LISTINGS_TOTAL
        .with_label_values(&["updated"])
        .inc_by(updated as f64);
    RECONCILIATION_LISTINGS_TOTAL
        .with_label_values(&["failed"])
        .inc_by(failed as f64);
}

/// Record a notification delivery. The tier is the delivery tier that
/// succeeded, or "failed" when all tiers were exhausted.
pub fn record_notification_delivery(kind: &str, tier: &str) {
    NOTIFICATION_DELIVERIES_TOTAL
        .with_label_values(&[kind, tier])
        .inc();
}

/// Record a command invocation
pub fn record_command(command: &str, outcome: &str) {
    COMMANDS_TOTAL.with_label_values(&[command, outcome]).inc();
}

/// Record a background job execution
pub fn record_background_job_execution(job: &str, status: &str, duration: Duration) {
    BACKGROUND_JOB_EXECUTIONS_TOTAL
        .with_label_values(&[job, status])
        .inc();

    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job])
        .observe(duration.as_secs_f64());
}

/// Record a skipped job tick
pub fn record_background_job_skipped(job: &str) {
    BACKGROUND_JOB_SKIPPED_TOTAL.with_label_values(&[job]).inc();
}

/// Mark a job as running or not
pub fn set_background_job_running(job: &str, running: bool) {
    BACKGROUND_JOB_RUNNING
        .with_label_values(&[job])
        .set(if running { 1.0 } else { 0.0 });
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        // This test ensures metrics can be initialized without panic
        init_metrics();

        // Verify we can gather metrics
        let metric_families = REGISTRY.gather();
        assert!(!metric_families.is_empty(), "Metrics should be registered");
    }

    #[test]
    fn test_record_http_request() {
        init_metrics();

        record_http_request("POST", "/v1/notify", 200, Duration::from_millis(50));

        let metrics = REGISTRY.gather();
        let http_metrics = metrics
            .iter()
            .find(|m| m.get_name() == "directory_sync_http_requests_total");

        assert!(http_metrics.is_some(), "HTTP request metrics should exist");
    }

    #[test]
    fn test_record_reconciliation_cycle() {
        init_metrics();

        record_reconciliation_cycle(2, 1, 1);

        let metrics = REGISTRY.gather();
        let cycle_metrics = metrics
            .iter()
            .find(|m| m.get_name() == "directory_sync_reconciliation_listings_total");

        assert!(cycle_metrics.is_some(), "Reconciliation metrics should exist");
    }

    #[test]
    fn test_record_notification_delivery() {
        init_metrics();

        record_notification_delivery("approve", "rich");
        record_notification_delivery("vote", "failed");

        let metrics = REGISTRY.gather();
        let delivery_metrics = metrics
            .iter()
            .find(|m| m.get_name() == "directory_sync_notification_deliveries_total");

        assert!(delivery_metrics.is_some(), "Delivery metrics should exist");
    }
}
