//! Comtrade endpoint configuration
//!
//! Everything that differs between deployments (base URL, token, timeouts) lives
//! in [`ComtradeConfig`], which is built once by the entry point and handed to
//! [`super::comtrade_http::ComtradeHttpClient`].

use crate::directory::DirectoryKind;
use std::time::Duration;

/// Public legacy API host
pub const DEFAULT_BASE_URL: &str = "http://comtrade.un.org";

/// Data query endpoint
pub const QUERY_ENDPOINT: &str = "/api/get";

/// Reporter directory resource
pub const REPORTERS_ENDPOINT: &str = "/data/cache/reporterAreas.json";

/// Partner directory resource
pub const PARTNERS_ENDPOINT: &str = "/data/cache/partnerAreas.json";

/// Bulk snapshot endpoint prefix
pub const BULK_ENDPOINT: &str = "/api/get/bulk";

/// Bulk availability endpoint
pub const AVAILABILITY_ENDPOINT: &str = "/api/refs/da/bulk";

/// Time to establish the TCP connection
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Overall time for one query; 50,000-row replies can be slow
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Overall time for a full annual snapshot
const BULK_TIMEOUT_SECS: u64 = 3600;

/// Connection settings for the Comtrade API
#[derive(Debug, Clone)]
pub struct ComtradeConfig {
    /// Scheme and host, without trailing slash
    pub base_url: String,
    /// Authorization token; empty means anonymous (lower rate limit)
    pub token: String,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Per-query timeout
    pub request_timeout: Duration,
    /// Bulk snapshot timeout
    pub bulk_timeout: Duration,
}

impl Default for ComtradeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: String::new(),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            bulk_timeout: Duration::from_secs(BULK_TIMEOUT_SECS),
        }
    }
}

impl ComtradeConfig {
    /// Override the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the authorization token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Whether a token is configured
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    /// URL of the data query endpoint
    pub fn query_url(&self) -> String {
        format!("{}{}", self.base_url, QUERY_ENDPOINT)
    }

    /// URL of a reference directory
    pub fn directory_url(&self, kind: DirectoryKind) -> String {
        let endpoint = match kind {
            DirectoryKind::Reporters => REPORTERS_ENDPOINT,
            DirectoryKind::Partners => PARTNERS_ENDPOINT,
        };
        format!("{}{}", self.base_url, endpoint)
    }

    /// URL of the annual HS commodity snapshot for `year`
    pub fn bulk_url(&self, year: i32) -> String {
        format!("{}{}/C/A/{}/ALL/HS", self.base_url, BULK_ENDPOINT, year)
    }

    /// URL of the bulk availability endpoint
    pub fn availability_url(&self) -> String {
        format!("{}{}", self.base_url, AVAILABILITY_ENDPOINT)
    }
}
