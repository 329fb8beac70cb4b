// Telemetry module for structured logging and metrics

use crate::dispatch::Platform;
use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize structured logging with JSON formatting.
///
/// Log levels come from `RUST_LOG` when set, otherwise from the configured
/// level.
pub fn init_logging(log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {}", e))?;

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    tracing::info!(
        log_level = log_level,
        "Structured logging initialized with JSON formatting"
    );

    Ok(())
}

/// Initialize the Prometheus metrics exporter and register all metrics
pub fn init_metrics(metrics_port: u16) -> Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", metrics_port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid metrics port: {}", e))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    describe_counter!("check_cycles_total", "Total number of check cycles run");
    describe_counter!(
        "checks_skipped_total",
        "Check cycles skipped by the fetch throttle or in-flight de-duplication"
    );
    describe_counter!(
        "cache_hits_total",
        "Checks served from the snapshot cache without a fetch"
    );
    describe_counter!(
        "source_fetches_total",
        "Real fetches issued to the value source"
    );
    describe_counter!("fetch_failures_total", "Value source fetches that failed");
    describe_counter!(
        "changes_detected_total",
        "Cell changes retained by the diff engine"
    );
    describe_counter!(
        "notifications_sent_total",
        "Notifications delivered to a webhook"
    );
    describe_counter!(
        "notifications_failed_total",
        "Notifications dropped after exhausting delivery attempts"
    );
    describe_histogram!(
        "notification_delivery_seconds",
        "Time to deliver a notification, including retries"
    );
    describe_gauge!("active_jobs", "Number of active monitoring jobs");

    tracing::info!(
        metrics_port = metrics_port,
        metrics_endpoint = format!("http://0.0.0.0:{}/metrics", metrics_port),
        "Prometheus metrics exporter initialized"
    );

    Ok(())
}

/// Record the start of one check cycle
#[inline]
pub fn record_check_cycle() {
    counter!("check_cycles_total").increment(1);
}

/// Record a check cycle skipped by throttling or de-duplication
#[inline]
pub fn record_fetch_skipped() {
    counter!("checks_skipped_total").increment(1);
}

/// Record a check served from the snapshot cache
#[inline]
pub fn record_cache_hit() {
    counter!("cache_hits_total").increment(1);
}

/// Record one real fetch against the value source
#[inline]
pub fn record_source_fetch() {
    counter!("source_fetches_total").increment(1);
}

/// Record a failed value source fetch
#[inline]
pub fn record_fetch_failure() {
    counter!("fetch_failures_total").increment(1);
}

/// Record changes retained by the diff engine for one cycle
#[inline]
pub fn record_changes_detected(count: usize) {
    counter!("changes_detected_total").increment(count as u64);
}

/// Record a delivered notification
#[inline]
pub fn record_notification_sent(platform: &Platform) {
    counter!("notifications_sent_total", "platform" => platform.to_string()).increment(1);
}

/// Record a notification dropped after exhausting its attempts
#[inline]
pub fn record_notification_failed(platform: &Platform) {
    counter!("notifications_failed_total", "platform" => platform.to_string()).increment(1);
}

/// Record how long one delivery took, retries included
#[inline]
pub fn record_dispatch_duration(duration_seconds: f64) {
    histogram!("notification_delivery_seconds").record(duration_seconds);
}

/// Update the active job gauge
#[inline]
pub fn update_active_jobs(count: usize) {
    gauge!("active_jobs").set(count as f64);
}
