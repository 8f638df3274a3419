//! Progress tracking for long-running jobs.
//!
//! A large job can take many hours at one request per 37 seconds, so the
//! executor logs a progress line after every descriptor with the completion
//! percentage and an estimate of the time remaining.

use std::time::{Duration, Instant};

/// Per-job progress state, counted in descriptors
#[derive(Debug, Clone)]
pub struct ProgressState {
    /// Descriptors processed so far (written or skipped)
    pub processed: u64,
    /// Descriptors in the job
    pub total: u64,
    /// Data rows written so far
    pub rows: u64,
    /// Timestamp when the job started
    pub start_time: Instant,
}

impl ProgressState {
    /// Start tracking a job of `total` descriptors
    pub fn new(total: u64) -> Self {
        Self {
            processed: 0,
            total,
            rows: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one processed descriptor
    pub fn advance(&mut self, rows: u64) {
        self.processed = self.processed.saturating_add(1);
        self.rows = self.rows.saturating_add(rows);
    }

    /// Completion percentage (0-100)
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.processed as f64 / self.total as f64) * 100.0
    }

    /// Remaining time extrapolated from the average time per descriptor so far
    pub fn estimate_remaining(&self) -> Option<Duration> {
        self.estimate_remaining_after(self.start_time.elapsed())
    }

    fn estimate_remaining_after(&self, elapsed: Duration) -> Option<Duration> {
        if self.processed == 0 || self.processed >= self.total {
            return None;
        }
        let per_item = elapsed.as_secs_f64() / self.processed as f64;
        let remaining = (self.total - self.processed) as f64 * per_item;
        Some(Duration::from_secs_f64(remaining))
    }

    /// Human-readable progress string for logging.
    pub fn format_progress(&self) -> String {
        let mut parts = vec![format!(
            "[PROGRESS] {}/{} queries - {:.1}% complete, {} rows",
            self.processed,
            self.total,
            self.percentage(),
            self.rows
        )];

        if let Some(remaining) = self.estimate_remaining() {
            parts.push(format!("- ~{} remaining", format_duration(remaining)));
        }

        parts.join(" ")
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{:.1}h", secs as f64 / 3600.0)
    }
}
