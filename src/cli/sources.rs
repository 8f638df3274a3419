//! CLI command for listing reporter and partner codes

use clap::Args;
use serde_json::json;

use super::download::Cli;
use super::CliError;
use crate::directory::{load_directory, CodeDirectory, DirectoryKind};

/// Sources subcommand
#[derive(Debug, Args)]
pub struct SourcesCommand {
    #[command(subcommand)]
    action: SourcesAction,
}

/// Sources actions
#[derive(Debug, clap::Subcommand)]
enum SourcesAction {
    /// List reporting countries
    Reporters {
        /// Only entries whose name contains this text (case-insensitive)
        filter: Option<String>,
    },
    /// List partner countries (World, code 0, is listed last)
    Partners {
        /// Only entries whose name contains this text (case-insensitive)
        filter: Option<String>,
    },
}

impl SourcesCommand {
    /// Execute the sources command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let (kind, filter) = match &self.action {
            SourcesAction::Reporters { filter } => (DirectoryKind::Reporters, filter.as_deref()),
            SourcesAction::Partners { filter } => (DirectoryKind::Partners, filter.as_deref()),
        };

        let client = cli.create_client()?;
        let directory = load_directory(client.as_ref(), kind).await?;
        let entries = list_entries(&directory, filter);

        match cli.output_format {
            super::download::OutputFormat::Json => {
                let rows: Vec<_> = entries
                    .iter()
                    .map(|(code, name)| json!({ "code": code, "name": name }))
                    .collect();
                println!("{}", json!(rows));
            }
            super::download::OutputFormat::Human => {
                println!("Found {} {}:\n", entries.len(), kind);
                for (code, name) in entries {
                    println!("{code:>5} | {name}");
                }
            }
        }

        Ok(())
    }
}

/// Code/name pairs in directory order, plus named non-iterable entries (World)
fn list_entries<'a>(directory: &'a CodeDirectory, filter: Option<&str>) -> Vec<(&'a str, &'a str)> {
    let needle = filter.map(str::to_lowercase);
    let matches = |name: &str| {
        needle
            .as_deref()
            .map_or(true, |n| name.to_lowercase().contains(n))
    };

    let mut entries: Vec<(&str, &str)> = directory
        .codes()
        .iter()
        .filter_map(|code| directory.name(code).map(|name| (code.as_str(), name)))
        .filter(|(_, name)| matches(*name))
        .collect();

    let mut extra: Vec<(&str, &str)> = directory
        .names()
        .iter()
        .filter(|(code, _)| !directory.codes().contains(*code))
        .map(|(code, name)| (code.as_str(), name.as_str()))
        .filter(|(_, name)| matches(*name))
        .collect();
    extra.sort();
    entries.extend(extra);
    entries
}
