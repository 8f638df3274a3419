//! Observability metrics for the Comtrade downloader
//!
//! Counters and histograms for every HTTP call, every classified query
//! outcome, every policy pause and every finished job.
//!
//! ## Architecture
//!
//! - Uses `metrics` crate for low-overhead metric collection
//! - Optional Prometheus exporter (`--metrics-addr`)
//! - Without an installed recorder every macro is a no-op

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Correlation ID generator for request tracing
static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Initialize metrics system with Prometheus exporter
///
/// Idempotent; later calls are ignored.
///
/// # Arguments
/// * `addr` - Socket address to bind Prometheus scrape endpoint (e.g., "0.0.0.0:9090")
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Total number of HTTP requests made to the Comtrade API"
    );

    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration in seconds"
    );

    describe_counter!(
        "query_outcomes_total",
        Unit::Count,
        "Classified query replies by outcome"
    );

    describe_counter!(
        "policy_pauses_total",
        Unit::Count,
        "Pauses taken by the retry policy, by reason"
    );

    describe_histogram!(
        "policy_pause_duration_seconds",
        Unit::Seconds,
        "Duration of retry policy pauses in seconds"
    );

    describe_counter!(
        "jobs_completed_total",
        Unit::Count,
        "Total number of jobs that ran to completion"
    );

    describe_counter!(
        "jobs_failed_total",
        Unit::Count,
        "Total number of jobs that failed or were cancelled"
    );

    describe_counter!(
        "rows_written_total",
        Unit::Count,
        "Data rows appended to output files"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Generate a new correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{:08x}", id)
}

/// Record an HTTP request with timing
pub struct HttpRequestMetrics {
    endpoint: String,
    start_time: Instant,
    correlation_id: String,
}

impl HttpRequestMetrics {
    /// Start recording a new HTTP request
    pub fn start(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let correlation_id = generate_correlation_id();

        debug!(
            correlation_id = %correlation_id,
            endpoint = %endpoint,
            "Starting HTTP request metrics"
        );

        Self {
            endpoint,
            start_time: Instant::now(),
            correlation_id,
        }
    }

    /// Record completion of the HTTP request
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint.clone(),
            "status" => status_code.to_string(),
        )
        .increment(1);

        histogram!(
            "http_request_duration_seconds",
            "endpoint" => self.endpoint.clone(),
        )
        .record(duration.as_secs_f64());

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            status = status_code,
            duration_ms = duration.as_millis(),
            "HTTP request completed"
        );
    }

    /// Record a network error (no status code)
    pub fn record_network_error(&self) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint.clone(),
            "status" => "network_error",
        )
        .increment(1);

        histogram!(
            "http_request_duration_seconds",
            "endpoint" => self.endpoint.clone(),
        )
        .record(duration.as_secs_f64());

        warn!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            duration_ms = duration.as_millis(),
            "Network error recorded"
        );
    }

    /// Get the correlation ID for this request
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Count one classified query reply
pub fn record_outcome(outcome: &'static str) {
    counter!("query_outcomes_total", "outcome" => outcome).increment(1);
}

/// Record a pause taken by the retry policy
pub fn record_policy_pause(reason: &'static str, duration: Duration) {
    counter!("policy_pauses_total", "reason" => reason).increment(1);
    histogram!("policy_pause_duration_seconds", "reason" => reason).record(duration.as_secs_f64());

    debug!(
        reason = reason,
        pause_ms = duration.as_millis(),
        "Policy pause recorded"
    );
}

/// Job metrics
pub struct JobMetrics {
    job_kind: String,
    target: String,
    start_time: Instant,
}

impl JobMetrics {
    /// Start tracking a job
    pub fn start(job_kind: impl Into<String>, target: impl Into<String>) -> Self {
        let job_kind = job_kind.into();
        let target = target.into();

        info!(
            job_kind = %job_kind,
            target = %target,
            "Job started"
        );

        Self {
            job_kind,
            target,
            start_time: Instant::now(),
        }
    }

    /// Record a job that ran to completion
    pub fn record_success(&self, rows: u64, skipped: usize) {
        let duration = self.start_time.elapsed();

        counter!(
            "jobs_completed_total",
            "job_kind" => self.job_kind.clone(),
        )
        .increment(1);
        counter!(
            "rows_written_total",
            "job_kind" => self.job_kind.clone(),
        )
        .increment(rows);

        info!(
            job_kind = %self.job_kind,
            target = %self.target,
            rows = rows,
            skipped = skipped,
            duration_secs = duration.as_secs(),
            "Job completed"
        );
    }

    /// Record a failed or cancelled job
    pub fn record_failure(&self, error: &str) {
        let duration = self.start_time.elapsed();

        counter!(
            "jobs_failed_total",
            "job_kind" => self.job_kind.clone(),
        )
        .increment(1);

        error!(
            job_kind = %self.job_kind,
            target = %self.target,
            error = %error,
            duration_secs = duration.as_secs(),
            "Job failed"
        );
    }
}

/// Check if metrics system is initialized
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}
