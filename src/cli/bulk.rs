//! Bulk snapshot and availability commands

use clap::Args;
use tracing::info;

use super::download::{Cli, OutputFormat};
use super::CliError;
use crate::fetcher::bulk::{check_availability, default_bulk_year, download_bulk};
use crate::Frequency;

/// Arguments for the bulk command
#[derive(Args, Debug)]
pub struct BulkArgs {
    /// Snapshot year, defaults to last year
    #[arg(long)]
    pub year: Option<i32>,

    /// Keep every column instead of the eight code and measure columns
    #[arg(long, default_value_t = false)]
    pub no_reduce: bool,
}

impl BulkArgs {
    /// Execute the bulk download
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let year = self.year.unwrap_or_else(default_bulk_year);
        let client = cli.create_client()?;

        let summary = download_bulk(client.as_ref(), year, !self.no_reduce, &cli.output_dir).await?;
        info!(year, path = %summary.path.display(), "Bulk command finished");

        match cli.output_format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "year": year,
                    "output_path": summary.path.display().to_string(),
                    "bytes": summary.bytes,
                    "rows": summary.rows,
                });
                println!("{output}");
            }
            OutputFormat::Human => {
                println!("Bulk snapshot {year} written to {}", summary.path.display());
                println!("Size: {:.2} MB", summary.megabytes());
                if let Some(rows) = summary.rows {
                    println!("Rows: {rows}");
                }
            }
        }
        Ok(())
    }
}

/// Arguments for the availability command
#[derive(Args, Debug)]
pub struct AvailabilityArgs {
    /// Period (YYYY or YYYYMM)
    #[arg(long)]
    pub period: String,

    /// Frequency: A (annual) or M (monthly)
    #[arg(long, default_value = "A")]
    pub freq: Frequency,
}

impl AvailabilityArgs {
    /// Execute the availability query
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let client = cli.create_client()?;
        let record = check_availability(client.as_ref(), &self.period, self.freq).await?;

        match cli.output_format {
            OutputFormat::Json => println!("{record}"),
            OutputFormat::Human => {
                let pretty = serde_json::to_string_pretty(&record)
                    .map_err(|e| CliError::InvalidArgument(format!("unprintable record: {e}")))?;
                println!("Bulk availability for {} ({}):\n{pretty}", self.period, self.freq);
            }
        }
        Ok(())
    }
}
