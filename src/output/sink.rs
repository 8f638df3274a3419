//! Header-aware response sink
//!
//! Every successful query reply is a complete delimited table with its own
//! header line. A job concatenates many replies into one file, so the sink
//! keeps the header of the first reply and drops it from every later one.
//! Bytes are otherwise written exactly as received (CRLF terminators stay).

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{OutputError, OutputResult, OutputWriter, ResponseWriter};

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// When the output file is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create (truncate) the file before the first request
    Eager,
    /// Create the file on the first successful reply; no reply, no file
    Lazy,
}

/// Writer that concatenates query replies into one table
pub struct ResponseSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    responses_written: u64,
    rows_written: u64,
}

impl ResponseSink {
    /// Create a sink for `path`; [`OpenMode::Eager`] creates the file immediately
    pub fn new<P: AsRef<Path>>(path: P, mode: OpenMode) -> OutputResult<Self> {
        let mut sink = Self {
            path: path.as_ref().to_path_buf(),
            writer: None,
            responses_written: 0,
            rows_written: 0,
        };
        if mode == OpenMode::Eager {
            sink.open()?;
        }
        Ok(sink)
    }

    /// Target path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file has been created
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Number of replies appended so far
    pub fn responses_written(&self) -> u64 {
        self.responses_written
    }

    /// Number of data rows (header excluded) appended so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    fn open(&mut self) -> OutputResult<&mut BufWriter<File>> {
        if self.writer.is_none() {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        OutputError::IoError(format!("Failed to create directory: {}", e))
                    })?;
                }
            }

            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.path)
                .map_err(|e| {
                    OutputError::IoError(format!(
                        "Failed to create {}: {}",
                        self.path.display(),
                        e
                    ))
                })?;
            info!(path = %self.path.display(), "Output file created");
            self.writer = Some(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));
        }

        self.writer
            .as_mut()
            .ok_or_else(|| OutputError::IoError("writer not open".to_string()))
    }
}

impl ResponseWriter for ResponseSink {
    fn append_response(&mut self, body: &str) -> OutputResult<u64> {
        let first = self.responses_written == 0;
        let chunk = if first { body } else { strip_header(body) };
        let rows = count_rows(body);

        let writer = self.open()?;
        writer
            .write_all(chunk.as_bytes())
            .map_err(|e| OutputError::IoError(format!("Failed to write response: {}", e)))?;
        if !chunk.is_empty() && !chunk.ends_with('\n') {
            writer
                .write_all(line_terminator(body).as_bytes())
                .map_err(|e| OutputError::IoError(format!("Failed to write response: {}", e)))?;
        }

        self.responses_written += 1;
        self.rows_written += rows;
        self.flush()?;

        debug!(
            path = %self.path.display(),
            rows,
            total_rows = self.rows_written,
            header_kept = first,
            "Response appended"
        );
        Ok(rows)
    }
}

impl OutputWriter for ResponseSink {
    fn flush(&mut self) -> OutputResult<()> {
        match self.writer.as_mut() {
            Some(writer) => writer
                .flush()
                .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e))),
            None => Ok(()),
        }
    }

    fn close(mut self) -> OutputResult<()> {
        self.flush()?;
        if self.writer.take().is_some() {
            info!(
                path = %self.path.display(),
                responses = self.responses_written,
                rows = self.rows_written,
                "Output file closed"
            );
        }
        Ok(())
    }
}

/// Everything after the first line terminator; empty when there is none
pub fn strip_header(body: &str) -> &str {
    match body.find('\n') {
        Some(idx) => &body[idx + 1..],
        None => "",
    }
}

/// Number of non-blank lines after the header
pub fn count_rows(body: &str) -> u64 {
    body.lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .count() as u64
}

fn line_terminator(body: &str) -> &'static str {
    if body.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}
