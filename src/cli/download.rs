//! Download command implementation

use crate::directory::{load_directories, CodeDirectory};
use crate::downloader::config::DEFAULT_MAX_RETRIES;
use crate::downloader::{DownloadError, DownloadExecutor, DownloadJob, JobProgress, ServerBusyAction};
use crate::fetcher::comtrade_config::{ComtradeConfig, DEFAULT_BASE_URL};
use crate::fetcher::comtrade_http::ComtradeHttpClient;
use crate::fetcher::ComtradeApi;
use crate::partition::{monthly_periods, months_between, YearMonth};
use crate::shutdown::SharedShutdown;
use clap::{ArgGroup, Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};

use super::CliError;

/// Reporters downloaded by `imports --selected`, by display name
pub const SELECTED_REPORTERS: [&str; 6] = ["China", "Indonesia", "India", "Viet Nam", "Turkey", "USA"];

/// "Other Asia, nes" (Taiwan) in the partner directory
pub const DEFAULT_PARTNER: &str = "490";

/// Comtrade Downloader CLI
#[derive(Parser, Debug)]
#[command(name = "comtrade-downloader")]
#[command(about = "Throttled bulk downloader for UN Comtrade trade statistics", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// API authorization token; anonymous access has a lower rate limit
    #[arg(long, global = true, env = "COMTRADE_TOKEN", default_value = "", hide_env_values = true)]
    pub token: String,

    /// API base URL
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Directory for output files
    #[arg(long, global = true, default_value = "data")]
    pub output_dir: PathBuf,

    /// Consecutive transport failures tolerated per query before a job fails
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Reaction to the server-busy reply: retry (wait 10 minutes) or skip
    ///
    /// Overrides the per-job default; annual partner jobs skip unless told otherwise.
    #[arg(long, global = true)]
    pub server_busy: Option<ServerBusyAction>,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Endpoint configuration from the global flags
    pub fn comtrade_config(&self) -> ComtradeConfig {
        ComtradeConfig::default()
            .with_base_url(self.base_url.as_str())
            .with_token(self.token.as_str())
    }

    /// HTTP client from the global flags
    pub fn create_client(&self) -> Result<Arc<ComtradeHttpClient>, CliError> {
        let client = ComtradeHttpClient::new(self.comtrade_config())?;
        Ok(Arc::new(client))
    }

    /// Executor from the global flags
    pub fn create_executor(&self, api: Arc<dyn ComtradeApi>, shutdown: SharedShutdown) -> DownloadExecutor {
        DownloadExecutor::new(api)
            .with_max_retries(self.max_retries)
            .with_shutdown(shutdown)
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download query-based trade data
    Download(DownloadArgs),

    /// Download an annual bulk snapshot
    Bulk(super::BulkArgs),

    /// Check which bulk snapshots exist for a period
    Availability(super::AvailabilityArgs),

    /// List reporter or partner codes
    Sources(super::SourcesCommand),
}

/// Download command arguments
#[derive(Parser, Debug)]
pub struct DownloadArgs {
    /// What to download
    #[command(subcommand)]
    pub kind: DownloadKind,
}

/// Download job families
#[derive(Subcommand, Debug)]
pub enum DownloadKind {
    /// Every reporter's monthly imports from one partner; one file per month
    PartnerMonthly(PartnerMonthlyArgs),
    /// Every reporter's annual imports from one partner; one file per year
    PartnerAnnual(PartnerAnnualArgs),
    /// Monthly imports of reporters from every partner; one file per reporter
    Imports(ImportsArgs),
    /// Annual imports of reporters from the world aggregate; one file per reporter
    WorldImports(WorldImportsArgs),
}

/// Arguments for partner-monthly downloads
#[derive(Args, Debug)]
pub struct PartnerMonthlyArgs {
    /// Partner code
    #[arg(long, default_value = DEFAULT_PARTNER)]
    pub partner: String,

    /// First month (YYYY-MM)
    #[arg(long)]
    pub from: YearMonth,

    /// Last month (YYYY-MM), defaults to --from
    #[arg(long)]
    pub to: Option<YearMonth>,
}

/// Arguments for partner-annual downloads
#[derive(Args, Debug)]
pub struct PartnerAnnualArgs {
    /// Partner code
    #[arg(long, default_value = DEFAULT_PARTNER)]
    pub partner: String,

    /// Year
    #[arg(long)]
    pub year: i32,
}

/// Arguments for per-reporter import downloads
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("which").required(true).args(["reporters", "selected", "all"])))]
pub struct ImportsArgs {
    /// Reporter code or exact display name (repeatable)
    #[arg(long = "reporter")]
    pub reporters: Vec<String>,

    /// China, Indonesia, India, Viet Nam, Turkey and USA
    #[arg(long)]
    pub selected: bool,

    /// Every reporter in the directory
    #[arg(long)]
    pub all: bool,

    /// First month (YYYY-MM)
    #[arg(long, default_value = "2010-01")]
    pub from: YearMonth,

    /// Last month (YYYY-MM)
    #[arg(long, default_value = "2016-04")]
    pub to: YearMonth,
}

/// Arguments for world-import downloads
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("which").required(true).args(["reporters", "all"])))]
pub struct WorldImportsArgs {
    /// Reporter code or exact display name (repeatable)
    #[arg(long = "reporter")]
    pub reporters: Vec<String>,

    /// Every reporter in the directory
    #[arg(long)]
    pub all: bool,

    /// Years, comma-separated
    #[arg(long, value_delimiter = ',', default_value = "2012,2013")]
    pub years: Vec<i32>,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

/// Resolve reporter selectors to directory codes, in request order
pub fn select_reporters(
    directory: &CodeDirectory,
    requested: &[String],
    selected: bool,
    all: bool,
) -> Result<Vec<String>, CliError> {
    if all {
        return Ok(directory.codes().to_vec());
    }

    let names: Vec<&str> = if selected {
        SELECTED_REPORTERS.to_vec()
    } else {
        requested.iter().map(String::as_str).collect()
    };

    names
        .into_iter()
        .map(|name| -> Result<String, CliError> { Ok(directory.resolve(name)?.to_string()) })
        .collect()
}

/// Jobs for every month in `from..=to`
pub fn partner_monthly_jobs<S: AsRef<str>>(
    partner: &str,
    from: YearMonth,
    to: YearMonth,
    reporters: &[S],
    output_dir: &Path,
) -> Result<Vec<DownloadJob>, CliError> {
    months_between(from, to)?
        .into_iter()
        .map(|month| -> Result<DownloadJob, CliError> {
            info!(partner, month = %month, month_name = %month.month_name(), "Queueing monthly job");
            Ok(DownloadJob::partner_monthly(partner, month, reporters, output_dir)?)
        })
        .collect()
}

/// One import job per reporter over `from..=to`
pub fn reporter_import_jobs(
    reporters: &[String],
    directories: &crate::directory::Directories,
    from: YearMonth,
    to: YearMonth,
    output_dir: &Path,
) -> Result<Vec<DownloadJob>, CliError> {
    let periods = monthly_periods(from, to)?;
    reporters
        .iter()
        .map(|code| -> Result<DownloadJob, CliError> {
            let stem = directories.reporters.file_stem(code)?;
            Ok(DownloadJob::reporter_imports(
                code,
                &stem,
                &periods,
                directories.partners.codes(),
                output_dir,
            )?)
        })
        .collect()
}

/// One world-import job per reporter
pub fn world_import_jobs(
    reporters: &[String],
    directory: &CodeDirectory,
    years: &[i32],
    output_dir: &Path,
) -> Result<Vec<DownloadJob>, CliError> {
    reporters
        .iter()
        .map(|code| -> Result<DownloadJob, CliError> {
            let stem = directory.file_stem(code)?;
            Ok(DownloadJob::world_imports(code, &stem, years, output_dir)?)
        })
        .collect()
}

impl DownloadArgs {
    /// Execute the download command
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        let client = cli.create_client()?;
        let directories = load_directories(client.as_ref()).await?;
        let output_dir = cli.output_dir.as_path();

        let jobs = match &self.kind {
            DownloadKind::PartnerMonthly(args) => {
                let to = args.to.unwrap_or(args.from);
                partner_monthly_jobs(
                    &args.partner,
                    args.from,
                    to,
                    directories.reporters.codes(),
                    output_dir,
                )?
            }
            DownloadKind::PartnerAnnual(args) => vec![DownloadJob::partner_annual(
                &args.partner,
                args.year,
                directories.reporters.codes(),
                output_dir,
            )?],
            DownloadKind::Imports(args) => {
                let reporters =
                    select_reporters(&directories.reporters, &args.reporters, args.selected, args.all)?;
                reporter_import_jobs(&reporters, &directories, args.from, args.to, output_dir)?
            }
            DownloadKind::WorldImports(args) => {
                let reporters =
                    select_reporters(&directories.reporters, &args.reporters, false, args.all)?;
                world_import_jobs(&reporters, &directories.reporters, &args.years, output_dir)?
            }
        };

        let jobs = match cli.server_busy {
            Some(action) => jobs
                .into_iter()
                .map(|job| job.with_server_busy(action))
                .collect(),
            None => jobs,
        };

        let executor = cli.create_executor(client, shutdown.clone());
        run_jobs(&executor, jobs, cli.output_format, &shutdown).await
    }
}

/// Run jobs one after another.
///
/// A failed job does not stop the batch; cancellation does.
pub async fn run_jobs(
    executor: &DownloadExecutor,
    jobs: Vec<DownloadJob>,
    format: OutputFormat,
    shutdown: &SharedShutdown,
) -> Result<(), CliError> {
    let total = jobs.len();
    let progress = create_progress_bar(total as u64);
    let mut failed = 0;

    info!(jobs = total, "Processing jobs sequentially");

    for job in jobs {
        if shutdown.is_shutdown_requested() {
            progress.abandon();
            return Err(DownloadError::Cancelled.into());
        }

        let name = job.name.clone();
        let output_path = job.output_path.clone();
        progress.set_message(name.clone());

        let result = executor.execute(job).await;
        progress.inc(1);
        progress.suspend(|| match format {
            OutputFormat::Json => output_json(&name, &output_path, &result),
            OutputFormat::Human => output_human(&name, &output_path, &result),
        });

        match result {
            Ok(_) => {}
            Err(DownloadError::Cancelled) => {
                progress.abandon();
                return Err(DownloadError::Cancelled.into());
            }
            Err(e) => {
                error!(job = %name, error = %e, "Job failed; continuing with the next one");
                failed += 1;
            }
        }
    }

    progress.finish_and_clear();

    if failed > 0 {
        return Err(CliError::JobsFailed { failed, total });
    }
    Ok(())
}

/// Output result as JSON
fn output_json(name: &str, output_path: &Path, result: &Result<JobProgress, DownloadError>) {
    let output = match result {
        Ok(progress) => serde_json::json!({
            "success": true,
            "job": name,
            "output_path": output_path.display().to_string(),
            "progress": progress,
        }),
        Err(e) => serde_json::json!({
            "success": false,
            "job": name,
            "output_path": output_path.display().to_string(),
            "error": e.to_string(),
        }),
    };
    println!("{output}");
}

/// Output result in human-readable format
fn output_human(name: &str, output_path: &Path, result: &Result<JobProgress, DownloadError>) {
    match result {
        Ok(progress) if progress.already_present => {
            println!("{name}: {} already exists, skipped", output_path.display());
        }
        Ok(progress) => {
            println!("\n{name} completed");
            println!("Output: {}", output_path.display());
            println!(
                "Queries written: {}/{}",
                progress.succeeded, progress.total_descriptors
            );
            println!("Rows written: {}", progress.rows_written);
            if progress.retries > 0 {
                println!("Retries: {}", progress.retries);
            }
            if progress.has_gaps() {
                println!("Skipped ({}):", progress.skipped.len());
                for label in &progress.skipped {
                    println!("  {label}");
                }
            }
        }
        Err(e) => {
            eprintln!("\n{name} failed!");
            eprintln!("Error: {e}");
        }
    }
}

/// Create progress bar with style
fn create_progress_bar(total_jobs: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_jobs);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} jobs {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}
