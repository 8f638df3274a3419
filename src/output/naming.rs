//! Output file naming
//!
//! - single-reporter jobs: normalized country name (`viet_nam.csv`)
//! - fixed-partner monthly jobs: `YYYY-MM.csv`
//! - fixed-partner annual jobs and bulk snapshots: `YYYY.csv`

use crate::partition::YearMonth;
use std::path::{Path, PathBuf};

/// Extension of every output file
pub const EXTENSION: &str = "csv";

/// Lowercase a display name and replace spaces with underscores.
///
/// Directory names such as `"Dem. People's Rep. of Korea"` keep their other
/// characters; path separators are replaced as well so a name can never
/// escape the output directory.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .replace(' ', "_")
        .replace(['/', '\\'], "_")
        .to_lowercase()
}

/// `<dir>/<stem>.csv` for a stem that is already normalized
pub fn stem_file(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.{EXTENSION}"))
}

/// `<dir>/YYYY-MM.csv`
pub fn month_file(dir: &Path, month: YearMonth) -> PathBuf {
    dir.join(format!("{month}.{EXTENSION}"))
}

/// `<dir>/YYYY.csv`
pub fn year_file(dir: &Path, year: i32) -> PathBuf {
    dir.join(format!("{year}.{EXTENSION}"))
}
