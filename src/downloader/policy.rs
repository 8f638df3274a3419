//! Unified retry policy
//!
//! Every classified reply goes through [`RetryPolicy::decide`], which maps it
//! to one [`Decision`]: write the body, retry the same descriptor, skip to the
//! next one, or fail the job. The pause to take afterwards comes from a
//! [`DelayTable`] so tests can run the same policy with zero delays.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::config::{
    DEFAULT_MAX_RETRIES, INTER_REQUEST_DELAY, RATE_LIMIT_DELAY, SERVER_BUSY_DELAY,
    TRANSPORT_RETRY_DELAY,
};
use super::DownloadError;
use crate::fetcher::ResponseOutcome;

/// What to do when the server reports it is busy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerBusyAction {
    /// Wait the long server-busy delay and ask again
    #[default]
    RetrySame,
    /// Wait the inter-request delay and move on, recording a gap
    SkipToNext,
}

impl ServerBusyAction {
    /// CLI spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerBusyAction::RetrySame => "retry",
            ServerBusyAction::SkipToNext => "skip",
        }
    }
}

impl fmt::Display for ServerBusyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerBusyAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "retry" => Ok(ServerBusyAction::RetrySame),
            "skip" => Ok(ServerBusyAction::SkipToNext),
            other => Err(format!(
                "invalid server-busy action '{other}', expected 'retry' or 'skip'"
            )),
        }
    }
}

/// Pause lengths per outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayTable {
    /// After a transport failure
    pub transport: Duration,
    /// After a server-busy reply when retrying the same descriptor
    pub server_busy: Duration,
    /// After a server-busy reply when skipping to the next descriptor
    pub server_busy_skip: Duration,
    /// After a rate-limit reply
    pub rate_limited: Duration,
    /// After a no-data reply
    pub no_data: Duration,
    /// After a written reply
    pub success: Duration,
    /// After an unrecognized reply
    pub unknown: Duration,
}

impl Default for DelayTable {
    fn default() -> Self {
        Self {
            transport: TRANSPORT_RETRY_DELAY,
            server_busy: SERVER_BUSY_DELAY,
            server_busy_skip: INTER_REQUEST_DELAY,
            rate_limited: RATE_LIMIT_DELAY,
            no_data: INTER_REQUEST_DELAY,
            success: INTER_REQUEST_DELAY,
            unknown: INTER_REQUEST_DELAY,
        }
    }
}

impl DelayTable {
    /// No pauses at all
    pub fn immediate() -> Self {
        Self {
            transport: Duration::ZERO,
            server_busy: Duration::ZERO,
            server_busy_skip: Duration::ZERO,
            rate_limited: Duration::ZERO,
            no_data: Duration::ZERO,
            success: Duration::ZERO,
            unknown: Duration::ZERO,
        }
    }
}

/// Outcome of applying the policy to one reply
#[derive(Debug)]
pub enum Decision {
    /// Append `body`, then pause and move to the next descriptor
    Write {
        /// Delimited reply
        body: String,
        /// Pause before the next request
        pause: Duration,
    },
    /// Pause and issue the same descriptor again
    Retry {
        /// Pause before the retry
        pause: Duration,
        /// Outcome label
        reason: &'static str,
    },
    /// Pause and move to the next descriptor without writing
    Skip {
        /// Pause before the next request
        pause: Duration,
        /// Outcome label
        reason: &'static str,
    },
    /// Stop the job
    Fail(DownloadError),
}

/// Delay table, failure ceiling and server-busy behaviour applied to every reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause lengths
    pub delays: DelayTable,
    /// Consecutive transport/unrecognized failures tolerated per descriptor
    pub max_retries: u32,
    /// Reaction to the server-busy reply
    pub server_busy: ServerBusyAction,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delays: DelayTable::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            server_busy: ServerBusyAction::RetrySame,
        }
    }
}

impl RetryPolicy {
    /// Replace the delay table
    pub fn with_delays(mut self, delays: DelayTable) -> Self {
        self.delays = delays;
        self
    }

    /// Replace the failure ceiling
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Replace the server-busy reaction
    pub fn with_server_busy(mut self, action: ServerBusyAction) -> Self {
        self.server_busy = action;
        self
    }

    /// Map a classified reply to a decision.
    ///
    /// `failures` counts consecutive transport/unrecognized failures for the
    /// current descriptor. It is incremented here and reset by any reply that
    /// proves the server is reachable.
    pub fn decide(&self, outcome: ResponseOutcome, failures: &mut u32) -> Decision {
        match outcome {
            ResponseOutcome::TransportFailure(message) => {
                *failures += 1;
                if *failures > self.max_retries {
                    return Decision::Fail(DownloadError::TransportExhausted {
                        attempts: *failures,
                        message,
                    });
                }
                Decision::Retry {
                    pause: self.delays.transport,
                    reason: "transport_failure",
                }
            }
            ResponseOutcome::Unknown { snippet, .. } => {
                *failures += 1;
                if *failures > self.max_retries {
                    return Decision::Fail(DownloadError::UnknownResponseExhausted {
                        attempts: *failures,
                        snippet,
                    });
                }
                Decision::Retry {
                    pause: self.delays.unknown,
                    reason: "unknown",
                }
            }
            ResponseOutcome::RateLimited => {
                *failures = 0;
                Decision::Retry {
                    pause: self.delays.rate_limited,
                    reason: "rate_limited",
                }
            }
            ResponseOutcome::ServerError => {
                *failures = 0;
                match self.server_busy {
                    ServerBusyAction::RetrySame => Decision::Retry {
                        pause: self.delays.server_busy,
                        reason: "server_error",
                    },
                    ServerBusyAction::SkipToNext => Decision::Skip {
                        pause: self.delays.server_busy_skip,
                        reason: "server_error",
                    },
                }
            }
            ResponseOutcome::NoDataMatch => {
                *failures = 0;
                Decision::Skip {
                    pause: self.delays.no_data,
                    reason: "no_data",
                }
            }
            ResponseOutcome::Success(body) => {
                *failures = 0;
                Decision::Write {
                    body,
                    pause: self.delays.success,
                }
            }
        }
    }
}
