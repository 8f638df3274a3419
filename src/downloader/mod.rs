//! Download orchestration
//!
//! This module provides the job model and the fetch-retry-append loop that
//! drives every query-based download.
//!
//! # Overview
//!
//! 1. **Job Creation**: a [`job::DownloadJob`] builder partitions a logical
//!    request into ordered [`job::QueryDescriptor`]s
//! 2. **Execution**: [`executor::DownloadExecutor`] issues one request at a
//!    time and appends successful replies to the job's output file
//! 3. **Policy**: [`policy::RetryPolicy`] decides, per classified reply,
//!    whether to write, retry, skip or give up, and how long to pause
//! 4. **Progress Tracking**: [`job::JobStatus`] and [`job::JobProgress`]
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use comtrade_downloader::downloader::{DownloadExecutor, DownloadJob};
//! use comtrade_downloader::fetcher::comtrade_config::ComtradeConfig;
//! use comtrade_downloader::fetcher::comtrade_http::ComtradeHttpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(ComtradeHttpClient::new(ComtradeConfig::default())?);
//!
//! // China's 2012-2013 imports from the world as a whole
//! let job = DownloadJob::world_imports("156", "china", &[2012, 2013], "./world")?;
//! let progress = DownloadExecutor::new(client).execute(job).await?;
//! assert!(progress.succeeded <= 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Recoverable replies (rate limit, server busy, no data) never leave the
//! loop. A job fails only on local IO errors, an exhausted retry ceiling,
//! invalid parameters or cancellation.

pub mod config;
pub mod executor;
pub mod job;
pub mod policy;
pub mod progress;

pub use executor::DownloadExecutor;
pub use job::{ClassificationParams, DownloadJob, JobKind, JobProgress, JobStatus, QueryDescriptor};
pub use policy::{Decision, DelayTable, RetryPolicy, ServerBusyAction};

use crate::fetcher::FetcherError;
use crate::output::OutputError;
use crate::partition::PartitionError;

/// Download errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Local file error; fatal for the job
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// Consecutive transport failures exceeded the retry ceiling
    #[error("transport failed {attempts} times in a row: {message}")]
    TransportExhausted {
        /// Failed attempts for the descriptor
        attempts: u32,
        /// Last transport error
        message: String,
    },

    /// Consecutive unrecognized replies exceeded the retry ceiling
    #[error("unrecognized reply {attempts} times in a row: {snippet}")]
    UnknownResponseExhausted {
        /// Failed attempts for the descriptor
        attempts: u32,
        /// Leading part of the last reply
        snippet: String,
    },

    /// Shutdown was requested while the job was running
    #[error("download cancelled")]
    Cancelled,

    /// Invalid job parameters
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Fetcher error outside the retry loop (bulk and availability requests)
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),
}

impl From<PartitionError> for DownloadError {
    fn from(err: PartitionError) -> Self {
        DownloadError::ValidationError(err.to_string())
    }
}
