//! Comtrade API access
//!
//! The [`ComtradeApi`] trait is the seam between the download loop and the
//! network: the executor and the directory loader only ever talk to it, so
//! tests can substitute a scripted in-memory source.

use crate::directory::DirectoryKind;
use crate::downloader::job::QueryDescriptor;
use async_trait::async_trait;

pub mod bulk;
pub mod classify;
pub mod comtrade_config;
pub mod comtrade_http;

pub use classify::{classify, ResponseOutcome};

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Connection, timeout or body-read failure
    #[error("transport error: {0}")]
    TransportError(String),

    /// Non-success HTTP status on an endpoint without sentinel handling
    #[error("HTTP error {status}: {message}")]
    HttpError {
        /// Status code
        status: u16,
        /// Response body excerpt
        message: String,
    },

    /// Response parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// Client could not be constructed
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    /// A success status whose body is not a data table
    #[error("rejected {outcome} reply: {description}")]
    RejectedReply {
        /// Classification label
        outcome: &'static str,
        /// User-facing description
        description: String,
    },
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Raw reply to a data query, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

impl RawResponse {
    /// Build a response from status and body
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 200 OK with the given body
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }
}

/// Source of Comtrade query responses and reference data
#[async_trait]
pub trait ComtradeApi: Send + Sync {
    /// Issue one data query.
    ///
    /// Returns the raw reply for any HTTP status; only transport-level failures
    /// are reported as errors, so the caller can classify sentinel bodies.
    async fn fetch_query(&self, query: &QueryDescriptor) -> FetcherResult<RawResponse>;

    /// Fetch the JSON text of a reference directory
    async fn fetch_directory(&self, kind: DirectoryKind) -> FetcherResult<String>;

    /// Base URL of the API, for logging
    fn base_url(&self) -> &str;
}
