//! CLI command implementations

pub mod bulk;
pub mod download;
pub mod error;
pub mod sources;

pub use bulk::{AvailabilityArgs, BulkArgs};
pub use download::{Cli, Commands, DownloadArgs};
pub use error::CliError;
pub use sources::SourcesCommand;
