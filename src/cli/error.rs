//! CLI error types and conversions

use crate::directory::DirectoryError;
use crate::downloader::DownloadError;
use crate::fetcher::FetcherError;
use crate::output::OutputError;
use crate::partition::PartitionError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Directory error
    #[error("directory error: {0}")]
    DirectoryError(#[from] DirectoryError),

    /// Download error
    #[error("download error: {0}")]
    DownloadError(#[from] DownloadError),

    /// Fetcher error
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// Period or batch parameter error
    #[error("partition error: {0}")]
    PartitionError(#[from] PartitionError),

    /// Some jobs of a batch failed
    #[error("{failed} of {total} jobs failed")]
    JobsFailed {
        /// Failed jobs
        failed: usize,
        /// Jobs attempted
        total: usize,
    },

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}
