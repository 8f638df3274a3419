//! Data output writers

pub mod csv;
pub mod naming;
pub mod sink;

pub use sink::{OpenMode, ResponseSink};

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV read or write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Requested column missing from the input header
    #[error("missing column: {0}")]
    MissingColumn(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Generic output writer trait
pub trait OutputWriter {
    /// Flush any buffered data to disk
    fn flush(&mut self) -> OutputResult<()>;

    /// Close the writer and finalize output
    fn close(self) -> OutputResult<()>;
}

/// Trait for writers that assemble one table from many delimited responses
pub trait ResponseWriter: OutputWriter {
    /// Append one response body, returning the number of data rows written
    fn append_response(&mut self, body: &str) -> OutputResult<u64>;
}
