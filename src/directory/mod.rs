//! Reporter and partner code directories
//!
//! The API publishes two static JSON resources enumerating valid country codes
//! with their display names. They are fetched once by the entry point, turned
//! into immutable [`CodeDirectory`] values and threaded through to the job
//! builders; nothing here is global or refreshed during a run.

use crate::fetcher::ComtradeApi;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

/// Aggregate entry present in both directories
pub const ALL_CODE: &str = "all";

/// "World" partner: valid as an explicit selector, excluded from iteration
pub const WORLD_CODE: &str = "0";

/// Directory errors
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// The resource could not be retrieved
    #[error("failed to fetch {kind} directory: {message}")]
    FetchError {
        /// Directory being loaded
        kind: DirectoryKind,
        /// Underlying error
        message: String,
    },

    /// The resource is not the expected JSON shape
    #[error("malformed {kind} directory: {message}")]
    Malformed {
        /// Directory being parsed
        kind: DirectoryKind,
        /// Parse failure
        message: String,
    },

    /// Code or name not present in the directory
    #[error("unknown {kind} code or name: {query}")]
    Unknown {
        /// Directory consulted
        kind: DirectoryKind,
        /// Requested code or name
        query: String,
    },
}

impl DirectoryError {
    fn unknown(kind: DirectoryKind, query: &str) -> Self {
        Self::Unknown {
            kind,
            query: query.to_string(),
        }
    }
}

/// Result type for directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Which directory a [`CodeDirectory`] holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryKind {
    /// Reporting countries
    Reporters,
    /// Partner countries
    Partners,
}

impl DirectoryKind {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectoryKind::Reporters => "reporters",
            DirectoryKind::Partners => "partners",
        }
    }

    /// Whether `id` is left out of the iterable code list
    fn excludes_from_list(&self, id: &str) -> bool {
        match self {
            DirectoryKind::Reporters => id == ALL_CODE,
            DirectoryKind::Partners => id == ALL_CODE || id == WORLD_CODE,
        }
    }
}

impl std::fmt::Display for DirectoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct RawDirectory {
    results: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    id: String,
    text: String,
}

/// Immutable code → display-name mapping plus the ordered list of iterable codes
#[derive(Debug, Clone)]
pub struct CodeDirectory {
    kind: DirectoryKind,
    codes: Vec<String>,
    names: HashMap<String, String>,
}

impl CodeDirectory {
    /// Parse a directory from the API's JSON document
    pub fn from_json(kind: DirectoryKind, json: &str) -> DirectoryResult<Self> {
        let raw: RawDirectory = serde_json::from_str(json).map_err(|e| DirectoryError::Malformed {
            kind,
            message: e.to_string(),
        })?;

        let mut codes = Vec::new();
        let mut names = HashMap::new();
        for entry in raw.results {
            if entry.id == ALL_CODE {
                continue;
            }
            if !kind.excludes_from_list(&entry.id) {
                codes.push(entry.id.clone());
            }
            names.insert(entry.id, entry.text);
        }

        Ok(Self { kind, codes, names })
    }

    /// Directory kind
    pub fn kind(&self) -> DirectoryKind {
        self.kind
    }

    /// Iterable codes in directory order
    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    /// Number of iterable codes
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the iterable list is empty
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// The id → name mapping, including non-iterable entries such as World
    pub fn names(&self) -> &HashMap<String, String> {
        &self.names
    }

    /// Display name for `code`
    pub fn name(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    /// Code whose display name is exactly `name`
    pub fn find_code(&self, name: &str) -> Option<&str> {
        // Directory order keeps the result stable when names repeat
        self.codes
            .iter()
            .chain(self.names.keys().filter(|k| !self.codes.contains(k)))
            .find(|code| self.names.get(*code).is_some_and(|n| n == name))
            .map(String::as_str)
    }

    /// Resolve a code or exact display name to a code
    pub fn resolve(&self, code_or_name: &str) -> DirectoryResult<&str> {
        if let Some((code, _)) = self.names.get_key_value(code_or_name) {
            return Ok(code.as_str());
        }
        self.find_code(code_or_name)
            .ok_or_else(|| DirectoryError::unknown(self.kind, code_or_name))
    }

    /// Output file stem for `code`: display name lowercased, spaces replaced by underscores
    pub fn file_stem(&self, code: &str) -> DirectoryResult<String> {
        self.name(code)
            .map(crate::output::naming::normalize_name)
            .ok_or_else(|| DirectoryError::unknown(self.kind, code))
    }
}

/// Both directories, loaded together at startup
#[derive(Debug, Clone)]
pub struct Directories {
    /// Reporting countries
    pub reporters: CodeDirectory,
    /// Partner countries
    pub partners: CodeDirectory,
}

/// Fetch and parse one directory
pub async fn load_directory<A>(api: &A, kind: DirectoryKind) -> DirectoryResult<CodeDirectory>
where
    A: ComtradeApi + ?Sized,
{
    debug!(kind = %kind, base_url = api.base_url(), "Fetching directory");
    let json = api
        .fetch_directory(kind)
        .await
        .map_err(|e| DirectoryError::FetchError {
            kind,
            message: e.to_string(),
        })?;

    let directory = CodeDirectory::from_json(kind, &json)?;
    info!(kind = %kind, codes = directory.len(), "Directory loaded");
    Ok(directory)
}

/// Fetch both directories
pub async fn load_directories<A>(api: &A) -> DirectoryResult<Directories>
where
    A: ComtradeApi + ?Sized,
{
    let reporters = load_directory(api, DirectoryKind::Reporters).await?;
    let partners = load_directory(api, DirectoryKind::Partners).await?;
    Ok(Directories {
        reporters,
        partners,
    })
}
