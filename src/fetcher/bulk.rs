//! Annual bulk snapshots
//!
//! One request returns every reporter's HS commodity trade for a year. The
//! reply is written as `<dest>/<year>.csv`, optionally projected to
//! [`BULK_COLUMNS`]. Rate-limit, server-busy and other non-table replies
//! are rejected before anything is written.

use chrono::Datelike;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::classify::{classify_response, ResponseOutcome};
use super::comtrade_http::ComtradeHttpClient;
use super::{FetcherError, FetcherResult, RawResponse};
use crate::downloader::DownloadError;
use crate::output::csv::{reduce_columns, BULK_COLUMNS};
use crate::output::naming;
use crate::output::OutputError;
use crate::Frequency;

/// Summary of a written snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct BulkSummary {
    /// Written file
    pub path: PathBuf,
    /// Size on disk in bytes
    pub bytes: u64,
    /// Data rows, when the table was reduced
    pub rows: Option<u64>,
}

impl BulkSummary {
    /// Size in megabytes
    pub fn megabytes(&self) -> f64 {
        self.bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Year whose snapshot is most likely complete: the previous calendar year
pub fn default_bulk_year() -> i32 {
    chrono::Local::now().year() - 1
}

/// Download the snapshot for `year` into `dest_dir`
pub async fn download_bulk(
    client: &ComtradeHttpClient,
    year: i32,
    reduce: bool,
    dest_dir: impl AsRef<Path>,
) -> Result<BulkSummary, DownloadError> {
    let path = naming::year_file(dest_dir.as_ref(), year);
    info!(year, reduce, path = %path.display(), "Downloading bulk snapshot");

    let body = match classify_response(RawResponse::ok(client.fetch_bulk(year).await?)) {
        ResponseOutcome::Success(body) => body,
        outcome => {
            warn!(year, outcome = outcome.label(), "Bulk reply is not a data table");
            return Err(FetcherError::RejectedReply {
                outcome: outcome.label(),
                description: outcome.description(),
            }
            .into());
        }
    };

    let rows = if reduce {
        Some(reduce_columns(body.as_bytes(), &BULK_COLUMNS, &path)?)
    } else {
        write_raw(&path, &body)?;
        None
    };

    let bytes = std::fs::metadata(&path)
        .map_err(|e| OutputError::IoError(format!("Failed to stat {}: {}", path.display(), e)))?
        .len();
    let summary = BulkSummary { path, bytes, rows };

    info!(
        path = %summary.path.display(),
        size_mb = format!("{:.2}", summary.megabytes()),
        rows = ?summary.rows,
        "Bulk snapshot written"
    );
    Ok(summary)
}

/// Availability record for bulk snapshots of `period`
pub async fn check_availability(
    client: &ComtradeHttpClient,
    period: &str,
    frequency: Frequency,
) -> FetcherResult<serde_json::Value> {
    let record = client.fetch_availability(period, frequency).await?;
    info!(period, frequency = %frequency, "Bulk availability retrieved");
    Ok(record)
}

fn write_raw(path: &Path, body: &str) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {}", e)))?;
        }
    }
    std::fs::write(path, body)
        .map_err(|e| OutputError::IoError(format!("Failed to write {}: {}", path.display(), e)))
}
