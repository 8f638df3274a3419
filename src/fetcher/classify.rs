//! Response classification for Comtrade data queries.
//!
//! The legacy API signals most failures in the body of an otherwise ordinary
//! reply, so classification looks at both the HTTP status and a documented set of
//! body patterns:
//!
//! | Pattern                                         | Outcome          |
//! |-------------------------------------------------|------------------|
//! | status 429, or body starting `RATE LIMIT:`      | `RateLimited`    |
//! | status 5xx, or body `{"Message":"An error has occurred."}` | `ServerError` |
//! | second line starting `No data matches your query` | `NoDataMatch`  |
//! | 2xx whose first line is a delimited header      | `Success`        |
//! | anything else                                   | `Unknown`        |

use super::{FetcherResult, RawResponse};

/// Body returned while the server is overloaded
pub const SERVER_BUSY_BODY: &str = r#"{"Message":"An error has occurred."}"#;

/// Prefix of the plain-text rate limit reply (`RATE LIMIT: You must wait 1 seconds.`)
pub const RATE_LIMIT_PREFIX: &str = "RATE LIMIT:";

/// Prefix of the CSV row that replaces data when a query matches nothing
pub const NO_DATA_PREFIX: &str = "No data matches your query";

const SNIPPET_LEN: usize = 120;

/// Classified reply to a single query attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Delimited data, header row first
    Success(String),
    /// Too many requests; wait briefly and retry
    RateLimited,
    /// Server overloaded or failing
    ServerError,
    /// Legitimate empty result
    NoDataMatch,
    /// The request never produced a reply
    TransportFailure(String),
    /// A reply that matches no known pattern
    Unknown {
        /// HTTP status code
        status: u16,
        /// Leading part of the body
        snippet: String,
    },
}

impl ResponseOutcome {
    /// Short label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::NoDataMatch => "no_data",
            Self::TransportFailure(_) => "transport_failure",
            Self::Unknown { .. } => "unknown",
        }
    }

    /// User-facing description
    pub fn description(&self) -> String {
        match self {
            Self::Success(_) => "data received".to_string(),
            Self::RateLimited => "rate limit exceeded".to_string(),
            Self::ServerError => "server busy".to_string(),
            Self::NoDataMatch => "no data matches the query".to_string(),
            Self::TransportFailure(msg) => format!("connection failed: {msg}"),
            Self::Unknown { status, snippet } => {
                format!("unrecognized response (HTTP {status}): {snippet}")
            }
        }
    }

    /// Whether this outcome carries data to write
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Classify the result of one query attempt
pub fn classify(result: FetcherResult<RawResponse>) -> ResponseOutcome {
    match result {
        Ok(response) => classify_response(response),
        Err(e) => ResponseOutcome::TransportFailure(e.to_string()),
    }
}

/// Classify a reply that reached us
pub fn classify_response(response: RawResponse) -> ResponseOutcome {
    let RawResponse { status, body } = response;
    let trimmed = body.trim();

    if status == 429 || trimmed.starts_with(RATE_LIMIT_PREFIX) {
        return ResponseOutcome::RateLimited;
    }

    if (500..600).contains(&status) || trimmed == SERVER_BUSY_BODY {
        return ResponseOutcome::ServerError;
    }

    if is_no_data(&body) {
        return ResponseOutcome::NoDataMatch;
    }

    if (200..300).contains(&status) && has_delimited_header(trimmed) {
        return ResponseOutcome::Success(body);
    }

    ResponseOutcome::Unknown {
        status,
        snippet: snippet(trimmed),
    }
}

fn is_no_data(body: &str) -> bool {
    body.lines()
        .nth(1)
        .is_some_and(|line| line.trim_start().starts_with(NO_DATA_PREFIX))
}

/// First line parses as a record of at least two fields and is not markup or JSON
fn has_delimited_header(body: &str) -> bool {
    let first = match body.lines().next() {
        Some(line) => line.trim(),
        None => return false,
    };
    if first.starts_with('<') || first.starts_with('{') || first.starts_with('[') {
        return false;
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(first.as_bytes());
    let fields = match reader.records().next() {
        Some(Ok(record)) => record.len(),
        _ => 0,
    };
    fields > 1
}

fn snippet(body: &str) -> String {
    if body.is_empty() {
        return "<empty body>".to_string();
    }
    body.chars().take(SNIPPET_LEN).collect()
}
