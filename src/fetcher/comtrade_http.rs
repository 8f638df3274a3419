//! Comtrade HTTP client
//!
//! Thin wrapper around a shared [`reqwest::Client`]:
//! - one GET per call, no internal retries (the executor owns the retry policy)
//! - every reply is returned as text with its status so sentinel bodies can be classified
//! - the authorization token from [`ComtradeConfig`] is attached to every query

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use super::comtrade_config::ComtradeConfig;
use super::{ComtradeApi, FetcherError, FetcherResult, RawResponse};
use crate::directory::DirectoryKind;
use crate::downloader::job::QueryDescriptor;
use crate::metrics::HttpRequestMetrics;
use crate::Frequency;

/// HTTP client for the Comtrade legacy API
pub struct ComtradeHttpClient {
    client: Client,
    config: ComtradeConfig,
}

impl ComtradeHttpClient {
    /// Create a client with the configured timeouts
    pub fn new(config: ComtradeConfig) -> FetcherResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FetcherError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create a client around an existing [`Client`]
    pub fn with_client(client: Client, config: ComtradeConfig) -> Self {
        Self { client, config }
    }

    /// Active configuration
    pub fn config(&self) -> &ComtradeConfig {
        &self.config
    }

    /// GET `url` and return the reply as text regardless of status
    async fn get_text(
        &self,
        endpoint: &str,
        url: &str,
        params: &[(&str, String)],
        timeout: Option<Duration>,
    ) -> FetcherResult<RawResponse> {
        let metrics = HttpRequestMetrics::start(endpoint);
        debug!(url = %url, params = params.len(), "GET");

        let mut request = self.client.get(url).query(params);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                metrics.record_network_error();
                warn!(url = %url, error = %e, "Request failed before a reply was received");
                return Err(FetcherError::TransportError(describe_reqwest_error(&e)));
            }
        };

        let status = response.status().as_u16();
        metrics.record_complete(status);

        let body = response
            .text()
            .await
            .map_err(|e| FetcherError::TransportError(describe_reqwest_error(&e)))?;

        Ok(RawResponse { status, body })
    }

    /// GET a JSON resource, failing on non-success status
    pub async fn get_json<T>(&self, endpoint: &str, url: &str, params: &[(&str, String)]) -> FetcherResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self.get_text(endpoint, url, params, None).await?;
        ensure_success(&response)?;

        serde_json::from_str(&response.body)
            .map_err(|e| FetcherError::ParseError(format!("Failed to deserialize {url}: {e}")))
    }

    /// Download the annual HS snapshot for all reporters as CSV text
    pub async fn fetch_bulk(&self, year: i32) -> FetcherResult<String> {
        let url = self.config.bulk_url(year);
        let params = self.token_param();
        let response = self
            .get_text("bulk", &url, &params, Some(self.config.bulk_timeout))
            .await?;
        ensure_success(&response)?;
        Ok(response.body)
    }

    /// Query which bulk snapshots exist for `period`; returns the first record
    pub async fn fetch_availability(
        &self,
        period: &str,
        frequency: Frequency,
    ) -> FetcherResult<serde_json::Value> {
        let url = self.config.availability_url();
        let params = [
            ("r", "all".to_string()),
            ("freq", frequency.code().to_string()),
            ("ps", period.to_string()),
            ("px", "HS".to_string()),
            ("type", "C".to_string()),
            ("token", self.config.token.clone()),
        ];

        let records: Vec<serde_json::Value> = self.get_json("availability", &url, &params).await?;
        records
            .into_iter()
            .next()
            .ok_or_else(|| FetcherError::ParseError(format!("No availability record for {period}")))
    }

    fn token_param(&self) -> Vec<(&'static str, String)> {
        if self.config.has_token() {
            vec![("token", self.config.token.clone())]
        } else {
            Vec::new()
        }
    }
}

#[async_trait]
impl ComtradeApi for ComtradeHttpClient {
    async fn fetch_query(&self, query: &QueryDescriptor) -> FetcherResult<RawResponse> {
        let url = self.config.query_url();
        let params = query.query_params(&self.config.token);
        self.get_text("query", &url, &params, None).await
    }

    async fn fetch_directory(&self, kind: DirectoryKind) -> FetcherResult<String> {
        let url = self.config.directory_url(kind);
        let response = self.get_text(kind.as_str(), &url, &[], None).await?;
        ensure_success(&response)?;
        Ok(response.body)
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

fn ensure_success(response: &RawResponse) -> FetcherResult<()> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    Err(FetcherError::HttpError {
        status: response.status,
        message: response.body.chars().take(200).collect(),
    })
}

fn describe_reqwest_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("network timeout: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}
