//! Fetch-retry-append executor
//!
//! Runs a job's descriptors strictly in order with a single request in
//! flight. Every reply is classified, passed through the [`RetryPolicy`] and
//! either appended to the job's [`ResponseSink`], retried or skipped. The
//! policy's pause is taken after every reply, including the last one.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};

use crate::downloader::policy::{Decision, DelayTable, RetryPolicy, ServerBusyAction};
use crate::downloader::progress::ProgressState;
use crate::downloader::{DownloadError, DownloadJob, JobProgress, JobStatus, QueryDescriptor};
use crate::fetcher::{classify, ComtradeApi};
use crate::metrics::{self, JobMetrics};
use crate::output::{OutputWriter, ResponseSink, ResponseWriter};
use crate::shutdown::SharedShutdown;

/// Download executor orchestrates the complete download workflow
pub struct DownloadExecutor {
    api: Arc<dyn ComtradeApi>,
    policy: RetryPolicy,
    shutdown: Option<SharedShutdown>,
}

impl DownloadExecutor {
    /// Create an executor with the default policy
    pub fn new(api: Arc<dyn ComtradeApi>) -> Self {
        Self {
            api,
            policy: RetryPolicy::default(),
            shutdown: None,
        }
    }

    /// Replace the retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set maximum number of consecutive transport failures per descriptor
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.policy.max_retries = max_retries;
        self
    }

    /// Replace the pause lengths
    pub fn with_delays(mut self, delays: DelayTable) -> Self {
        self.policy.delays = delays;
        self
    }

    /// Set the server-busy reaction for jobs without their own override
    pub fn with_server_busy(mut self, action: ServerBusyAction) -> Self {
        self.policy.server_busy = action;
        self
    }

    /// Attach a shared shutdown handle for graceful cancellation.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Active policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|s| s.is_shutdown_requested())
            .unwrap_or(false)
    }

    /// Sleep for `duration`; fails with [`DownloadError::Cancelled`] if shutdown interrupts it
    async fn pause(&self, reason: &'static str, duration: Duration) -> Result<(), DownloadError> {
        metrics::record_policy_pause(reason, duration);
        debug!(reason, pause_secs = duration.as_secs_f64(), "Pausing");

        match &self.shutdown {
            Some(shutdown) => {
                if shutdown.sleep(duration).await {
                    Ok(())
                } else {
                    Err(DownloadError::Cancelled)
                }
            }
            None => {
                if !duration.is_zero() {
                    tokio::time::sleep(duration).await;
                }
                Ok(())
            }
        }
    }

    /// Execute a job and return its progress report.
    ///
    /// The output file is closed on every path. On error the rows already
    /// appended stay on disk.
    pub async fn execute(&self, job: DownloadJob) -> Result<JobProgress, DownloadError> {
        let span = tracing::info_span!(
            "execute_job",
            job = %job.name,
            kind = job.kind.as_str(),
            descriptors = job.descriptors.len(),
            output = %job.output_path.display()
        );
        self.execute_inner(job).instrument(span).await
    }

    async fn execute_inner(&self, mut job: DownloadJob) -> Result<JobProgress, DownloadError> {
        info!("Starting download job");
        job.validate()?;
        job.progress.total_descriptors = job.descriptors.len() as u64;

        if job.skip_if_exists && job.output_path.exists() {
            info!("Output already exists; skipping job");
            job.status = JobStatus::Completed;
            job.progress.already_present = true;
            return Ok(job.progress);
        }

        let job_metrics = JobMetrics::start(job.kind.as_str(), &job.name);
        let policy = match job.server_busy {
            Some(action) => self.policy.with_server_busy(action),
            None => self.policy,
        };

        let mut sink = ResponseSink::new(&job.output_path, job.open_mode)?;
        job.status = JobStatus::InProgress;

        let result = self.run_descriptors(&mut job, &policy, &mut sink).await;
        let close_result = sink.close();
        let result = result.and(close_result.map_err(DownloadError::from));

        match &result {
            Ok(()) => {
                job.status = JobStatus::Completed;
                job_metrics.record_success(job.progress.rows_written, job.progress.skipped.len());
            }
            Err(e) => {
                job.status = match e {
                    DownloadError::Cancelled => JobStatus::Cancelled,
                    _ => JobStatus::Failed,
                };
                job.progress.error = Some(e.to_string());
                job_metrics.record_failure(&e.to_string());
            }
        }

        info!(
            status = ?job.status,
            succeeded = job.progress.succeeded,
            skipped = job.progress.skipped.len(),
            rows = job.progress.rows_written,
            requests = job.progress.api_requests,
            retries = job.progress.retries,
            "Download job finished"
        );
        if job.progress.has_gaps() {
            warn!(skipped = ?job.progress.skipped, "Job completed with gaps");
        }

        result.map(|()| job.progress)
    }

    async fn run_descriptors(
        &self,
        job: &mut DownloadJob,
        policy: &RetryPolicy,
        sink: &mut ResponseSink,
    ) -> Result<(), DownloadError> {
        let mut progress_state = ProgressState::new(job.descriptors.len() as u64);

        for descriptor in &job.descriptors {
            if self.shutdown_requested() {
                info!("Shutdown requested - stopping before next query");
                return Err(DownloadError::Cancelled);
            }

            let rows = self
                .process_descriptor(descriptor, policy, sink, &mut job.progress)
                .await?;
            progress_state.advance(rows);
            info!("{}", progress_state.format_progress());
        }

        Ok(())
    }

    /// Issue one descriptor until the policy writes it, skips it or gives up.
    /// Returns the number of rows written.
    async fn process_descriptor(
        &self,
        descriptor: &QueryDescriptor,
        policy: &RetryPolicy,
        sink: &mut ResponseSink,
        progress: &mut JobProgress,
    ) -> Result<u64, DownloadError> {
        let label = descriptor.label();
        let mut failures = 0u32;

        loop {
            progress.api_requests += 1;
            let outcome = classify(self.api.fetch_query(descriptor).await);
            metrics::record_outcome(outcome.label());
            let description = outcome.description();

            match policy.decide(outcome, &mut failures) {
                Decision::Write { body, pause } => {
                    let rows = sink.append_response(&body)?;
                    progress.succeeded += 1;
                    progress.rows_written += rows;
                    info!(
                        query = %label,
                        rows,
                        finished_at = %chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                        "Query written"
                    );
                    self.pause("success", pause).await?;
                    return Ok(rows);
                }
                Decision::Skip { pause, reason } => {
                    progress.skipped.push(label.clone());
                    warn!(query = %label, reason, "Query skipped: {}", description);
                    self.pause(reason, pause).await?;
                    return Ok(0);
                }
                Decision::Retry { pause, reason } => {
                    progress.retries += 1;
                    warn!(
                        query = %label,
                        reason,
                        consecutive_failures = failures,
                        max_retries = policy.max_retries,
                        pause_secs = pause.as_secs(),
                        "Retrying query: {}",
                        description
                    );
                    self.pause(reason, pause).await?;
                }
                Decision::Fail(error) => {
                    warn!(query = %label, error = %error, "Giving up on query");
                    return Err(error);
                }
            }
        }
    }
}
