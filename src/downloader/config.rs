//! Download configuration constants

use std::time::Duration;

/// Row cap of a single query; large queries are partitioned to stay under it
pub const MAX_ROWS_PER_QUERY: u32 = 50_000;

/// Default ceiling on consecutive transport (or unrecognized-reply) failures
/// for one descriptor before the job fails.
pub const DEFAULT_MAX_RETRIES: u32 = 20;

/// Pause after a request that never produced a reply
pub const TRANSPORT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Pause after the server-busy reply before asking again
pub const SERVER_BUSY_DELAY: Duration = Duration::from_secs(600);

/// Pause after a rate-limit reply
pub const RATE_LIMIT_DELAY: Duration = Duration::from_secs(5);

/// Fixed pause after every completed descriptor (written or skipped).
/// Keeps an anonymous client under the hourly request quota.
pub const INTER_REQUEST_DELAY: Duration = Duration::from_secs(37);
