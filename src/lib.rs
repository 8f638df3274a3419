//! # Comtrade Downloader Library
//!
//! A throttled bulk downloader for UN Comtrade international trade statistics.
//! Large logical queries ("all monthly imports of one reporter from every
//! partner over six years") are decomposed into many small requests that stay
//! under the API row cap, executed one at a time with fixed pauses, retried on
//! recoverable failures and reassembled into a single CSV file per job.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use comtrade_downloader::directory::load_directories;
//! use comtrade_downloader::downloader::{DownloadExecutor, DownloadJob};
//! use comtrade_downloader::fetcher::comtrade_config::ComtradeConfig;
//! use comtrade_downloader::fetcher::comtrade_http::ComtradeHttpClient;
//! use comtrade_downloader::partition::YearMonth;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(ComtradeHttpClient::new(ComtradeConfig::default())?);
//! let directories = load_directories(client.as_ref()).await?;
//!
//! // Imports of every reporter from Taiwan (490), June 2015
//! let job = DownloadJob::partner_monthly(
//!     "490",
//!     YearMonth::new(2015, 6)?,
//!     directories.reporters.codes(),
//!     "./data",
//! )?;
//!
//! let executor = DownloadExecutor::new(client);
//! let report = executor.execute(job).await?;
//! println!("{} written, {} skipped", report.succeeded, report.skipped.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`directory`] - Reporter/partner code directories, loaded once per run
//! - [`partition`] - Batching of codes and periods into query selectors
//! - [`fetcher`] - Comtrade HTTP client, response classification, bulk snapshots
//! - [`downloader`] - Jobs, the unified retry policy and the fetch-retry-append executor
//! - [`output`] - Header-stripping append sink, file naming, CSV column projection
//! - [`shutdown`] - Ctrl+C coordination for long-running jobs

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// CLI command implementations
pub mod cli;

/// Reference-data directories
pub mod directory;

/// Download orchestration
pub mod downloader;

/// Comtrade API access
pub mod fetcher;

/// Prometheus metrics
pub mod metrics;

/// Output sinks and naming
pub mod output;

/// Query partitioning
pub mod partition;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

pub use directory::{CodeDirectory, Directories, DirectoryKind};
pub use downloader::{DownloadExecutor, DownloadJob, JobProgress, JobStatus};

/// Reporting frequency of a query (`freq` parameter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    /// Annual data, periods formatted `YYYY`
    #[serde(rename = "A")]
    Annual,
    /// Monthly data, periods formatted `YYYYMM`
    #[serde(rename = "M")]
    Monthly,
}

impl Frequency {
    /// Wire code sent to the API
    pub fn code(&self) -> &'static str {
        match self {
            Frequency::Annual => "A",
            Frequency::Monthly => "M",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" | "ANNUAL" => Ok(Frequency::Annual),
            "M" | "MONTHLY" => Ok(Frequency::Monthly),
            _ => Err(format!("Invalid frequency: {s}")),
        }
    }
}

/// Direction of trade (`rg` parameter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeFlow {
    /// Imports (`rg=1`)
    Import,
    /// Exports (`rg=2`)
    Export,
    /// Re-exports (`rg=3`)
    ReExport,
    /// Re-imports (`rg=4`)
    ReImport,
}

impl TradeFlow {
    /// Wire code sent to the API
    pub fn code(&self) -> &'static str {
        match self {
            TradeFlow::Import => "1",
            TradeFlow::Export => "2",
            TradeFlow::ReExport => "3",
            TradeFlow::ReImport => "4",
        }
    }
}

impl std::fmt::Display for TradeFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for TradeFlow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "import" => Ok(TradeFlow::Import),
            "2" | "export" => Ok(TradeFlow::Export),
            "3" | "re-export" => Ok(TradeFlow::ReExport),
            "4" | "re-import" => Ok(TradeFlow::ReImport),
            _ => Err(format!("Invalid trade flow: {s}")),
        }
    }
}
