//! Download job structures and status tracking
//!
//! A job is an ordered list of [`QueryDescriptor`]s plus one output file.
//! The builders here turn a logical request into that list by partitioning
//! reporters, partners and periods into batches small enough for the
//! per-query row cap.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::config::MAX_ROWS_PER_QUERY;
use super::policy::ServerBusyAction;
use super::DownloadError;
use crate::directory::WORLD_CODE;
use crate::output::naming;
use crate::output::OpenMode;
use crate::partition::{
    cross_product, partition, YearMonth, PARTNER_BATCH_SIZE, PERIOD_BATCH_SIZE,
    REPORTER_BATCH_SIZE,
};
use crate::{Frequency, TradeFlow};

/// Query parameters that are the same for every descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationParams {
    /// Trade record type (`C` = commodities)
    pub trade_type: &'static str,
    /// Product classification (`HS`)
    pub classification: &'static str,
    /// Trade flow direction
    pub flow: TradeFlow,
    /// Commodity code level (`AG6` = six-digit HS)
    pub commodity: &'static str,
    /// Row cap per query
    pub max_rows: u32,
    /// Reply format
    pub format: &'static str,
}

impl Default for ClassificationParams {
    fn default() -> Self {
        Self {
            trade_type: "C",
            classification: "HS",
            flow: TradeFlow::Import,
            commodity: "AG6",
            max_rows: MAX_ROWS_PER_QUERY,
            format: "csv",
        }
    }
}

/// One atomic query: a reporter selector, a partner selector and a period selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor {
    /// Single code or comma-joined batch
    pub reporters: String,
    /// Single code, comma-joined batch or `"0"` for the world
    pub partners: String,
    /// Single period or comma-joined batch (`YYYYMM` or `YYYY`)
    pub periods: String,
    /// Reporting frequency
    pub frequency: Frequency,
    /// Fixed parameters
    pub params: ClassificationParams,
}

impl QueryDescriptor {
    /// Create a descriptor with the default classification parameters
    pub fn new(
        reporters: impl Into<String>,
        partners: impl Into<String>,
        periods: impl Into<String>,
        frequency: Frequency,
    ) -> Self {
        Self {
            reporters: reporters.into(),
            partners: partners.into(),
            periods: periods.into(),
            frequency,
            params: ClassificationParams::default(),
        }
    }

    /// Query string parameters in wire order; the token is always sent, even empty
    pub fn query_params(&self, token: &str) -> Vec<(&'static str, String)> {
        vec![
            ("max", self.params.max_rows.to_string()),
            ("type", self.params.trade_type.to_string()),
            ("freq", self.frequency.code().to_string()),
            ("px", self.params.classification.to_string()),
            ("ps", self.periods.clone()),
            ("r", self.reporters.clone()),
            ("p", self.partners.clone()),
            ("rg", self.params.flow.code().to_string()),
            ("cc", self.params.commodity.to_string()),
            ("fmt", self.params.format.to_string()),
            ("token", token.to_string()),
        ]
    }

    /// Compact label naming the key dimensions, used in logs and skip reports
    pub fn label(&self) -> String {
        format!("r={} p={} ps={}", self.reporters, self.partners, self.periods)
    }
}

impl fmt::Display for QueryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Shape of a job, used for logging and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    /// Every reporter's imports from one partner, one month
    PartnerMonthly,
    /// Every reporter's imports from one partner, one year
    PartnerAnnual,
    /// One reporter's monthly imports from every partner
    ReporterImports,
    /// One reporter's annual imports from the world aggregate
    WorldImports,
    /// Hand-assembled descriptor list
    Custom,
}

impl JobKind {
    /// Snake-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::PartnerMonthly => "partner_monthly",
            JobKind::PartnerAnnual => "partner_annual",
            JobKind::ReporterImports => "reporter_imports",
            JobKind::WorldImports => "world_imports",
            JobKind::Custom => "custom",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Download job definition
#[derive(Debug, Clone)]
pub struct DownloadJob {
    /// Human-readable name (e.g. `"490 2015-06"`)
    pub name: String,
    /// Job shape
    pub kind: JobKind,
    /// Output file path
    pub output_path: PathBuf,
    /// Descriptors in execution order
    pub descriptors: Vec<QueryDescriptor>,
    /// When the output file is created
    pub open_mode: OpenMode,
    /// Do nothing if the output file already exists
    pub skip_if_exists: bool,
    /// Overrides the executor's server-busy reaction for this job
    pub server_busy: Option<ServerBusyAction>,
    /// Current job status
    pub status: JobStatus,
    /// Job progress tracking
    pub progress: JobProgress,
}

impl DownloadJob {
    /// Create a job from an explicit descriptor list
    pub fn new(
        name: impl Into<String>,
        kind: JobKind,
        output_path: impl Into<PathBuf>,
        descriptors: Vec<QueryDescriptor>,
    ) -> Self {
        let progress = JobProgress {
            total_descriptors: descriptors.len() as u64,
            ..JobProgress::default()
        };
        Self {
            name: name.into(),
            kind,
            output_path: output_path.into(),
            descriptors,
            open_mode: OpenMode::Eager,
            skip_if_exists: false,
            server_busy: None,
            status: JobStatus::Pending,
            progress,
        }
    }

    /// Imports of every reporter from `partner` in one month.
    ///
    /// Reporters are batched five per query; output is `<dir>/YYYY-MM.csv`.
    pub fn partner_monthly<S: AsRef<str>>(
        partner: &str,
        month: YearMonth,
        reporters: &[S],
        output_dir: impl AsRef<Path>,
    ) -> Result<Self, DownloadError> {
        let period = month.period();
        let descriptors = partition(reporters, REPORTER_BATCH_SIZE)?
            .into_iter()
            .map(|batch| QueryDescriptor::new(batch, partner, period.as_str(), Frequency::Monthly))
            .collect();

        let job = Self::new(
            format!("{partner} {month}"),
            JobKind::PartnerMonthly,
            naming::month_file(output_dir.as_ref(), month),
            descriptors,
        );
        job.validate()?;
        Ok(job)
    }

    /// Imports of every reporter from `partner` in one year.
    ///
    /// One query per reporter; output is `<dir>/YYYY.csv`. A server-busy reply
    /// skips to the next reporter instead of waiting.
    pub fn partner_annual<S: AsRef<str>>(
        partner: &str,
        year: i32,
        reporters: &[S],
        output_dir: impl AsRef<Path>,
    ) -> Result<Self, DownloadError> {
        let period = year.to_string();
        let descriptors = reporters
            .iter()
            .map(|r| QueryDescriptor::new(r.as_ref(), partner, period.as_str(), Frequency::Annual))
            .collect();

        let job = Self::new(
            format!("{partner} {year}"),
            JobKind::PartnerAnnual,
            naming::year_file(output_dir.as_ref(), year),
            descriptors,
        )
        .with_server_busy(ServerBusyAction::SkipToNext);
        job.validate()?;
        Ok(job)
    }

    /// Monthly imports of `reporter` from every partner over `periods`.
    ///
    /// Periods are batched three per query and partners five per query;
    /// descriptors iterate period batches in the outer loop. Output is
    /// `<dir>/<stem>.csv`.
    pub fn reporter_imports<P: AsRef<str>, Q: AsRef<str>>(
        reporter: &str,
        stem: &str,
        periods: &[P],
        partners: &[Q],
        output_dir: impl AsRef<Path>,
    ) -> Result<Self, DownloadError> {
        let period_batches = partition(periods, PERIOD_BATCH_SIZE)?;
        let partner_batches = partition(partners, PARTNER_BATCH_SIZE)?;
        let descriptors = cross_product(&period_batches, &partner_batches)
            .into_iter()
            .map(|(ps, p)| QueryDescriptor::new(reporter, p, ps, Frequency::Monthly))
            .collect();

        let job = Self::new(
            format!("{reporter} imports"),
            JobKind::ReporterImports,
            naming::stem_file(output_dir.as_ref(), stem),
            descriptors,
        );
        job.validate()?;
        Ok(job)
    }

    /// Annual imports of `reporter` from the world aggregate for `years`.
    ///
    /// A single query. The file is only created if data arrives, and the job
    /// does nothing when `<dir>/<stem>.csv` already exists.
    pub fn world_imports(
        reporter: &str,
        stem: &str,
        years: &[i32],
        output_dir: impl AsRef<Path>,
    ) -> Result<Self, DownloadError> {
        let periods = years
            .iter()
            .map(|y| y.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let descriptor = QueryDescriptor::new(reporter, WORLD_CODE, periods, Frequency::Annual);

        let mut job = Self::new(
            format!("{reporter} world"),
            JobKind::WorldImports,
            naming::stem_file(output_dir.as_ref(), stem),
            vec![descriptor],
        );
        job.open_mode = OpenMode::Lazy;
        job.skip_if_exists = true;
        job.validate()?;
        Ok(job)
    }

    /// Set the server-busy override
    pub fn with_server_busy(mut self, action: ServerBusyAction) -> Self {
        self.server_busy = Some(action);
        self
    }

    /// Set the file-open mode
    pub fn with_open_mode(mut self, mode: OpenMode) -> Self {
        self.open_mode = mode;
        self
    }

    /// Validate job parameters
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.descriptors.is_empty() {
            return Err(DownloadError::ValidationError(format!(
                "job '{}' has no queries",
                self.name
            )));
        }

        for descriptor in &self.descriptors {
            if descriptor.reporters.is_empty()
                || descriptor.partners.is_empty()
                || descriptor.periods.is_empty()
            {
                return Err(DownloadError::ValidationError(format!(
                    "job '{}' has an incomplete query: {}",
                    self.name, descriptor
                )));
            }
        }

        if self.output_path.file_name().is_none() {
            return Err(DownloadError::ValidationError(format!(
                "job '{}' has no output file name",
                self.name
            )));
        }

        Ok(())
    }
}

/// Job execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum JobStatus {
    /// Job has not started yet
    #[default]
    Pending,
    /// Job is currently running
    InProgress,
    /// Job processed every descriptor
    Completed,
    /// Job failed with error
    Failed,
    /// Job was cancelled
    Cancelled,
}

/// Job progress tracking
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct JobProgress {
    /// Number of descriptors in the job
    pub total_descriptors: u64,
    /// Descriptors whose data was written
    pub succeeded: u64,
    /// Labels of descriptors that were skipped (no data, or server busy under skip policy)
    pub skipped: Vec<String>,
    /// Data rows appended (headers excluded)
    pub rows_written: u64,
    /// HTTP requests issued
    pub api_requests: u64,
    /// Retries of the same descriptor
    pub retries: u64,
    /// The job did nothing because its output already existed
    pub already_present: bool,
    /// Error message if job failed
    pub error: Option<String>,
}

impl JobProgress {
    /// Descriptors processed so far (written or skipped)
    pub fn processed(&self) -> u64 {
        self.succeeded + self.skipped.len() as u64
    }

    /// Completion percentage (0.0 to 100.0)
    pub fn percentage(&self) -> f64 {
        if self.total_descriptors == 0 {
            100.0
        } else {
            (self.processed() as f64 / self.total_descriptors as f64) * 100.0
        }
    }

    /// Whether every descriptor has been processed
    pub fn is_complete(&self) -> bool {
        self.processed() >= self.total_descriptors
    }

    /// Whether any descriptor was skipped, leaving a gap in the output
    pub fn has_gaps(&self) -> bool {
        !self.skipped.is_empty()
    }
}
