//! Column projection for bulk snapshots
//!
//! Annual bulk files carry ~20 descriptive columns per row. Most analysis only
//! needs the codes and measures, so the bulk path can rewrite the file keeping
//! [`BULK_COLUMNS`] in that order.

use csv::{ReaderBuilder, Writer};
use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::Path;
use tracing::{debug, info};

use super::{OutputError, OutputResult};

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Columns kept by [`reduce_columns`]
pub const BULK_COLUMNS: [&str; 8] = [
    "Trade Flow Code",
    "Reporter Code",
    "Partner Code",
    "Commodity Code",
    "Qty Unit Code",
    "Qty",
    "Netweight (kg)",
    "Trade Value (US$)",
];

/// Write the `columns` of the delimited table in `input` to `out_path`.
///
/// Returns the number of data rows written. Fails with
/// [`OutputError::MissingColumn`] if the header lacks any requested column.
pub fn reduce_columns<R, P>(input: R, columns: &[&str], out_path: P) -> OutputResult<u64>
where
    R: Read,
    P: AsRef<Path>,
{
    let out_path = out_path.as_ref();
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| OutputError::CsvError(format!("Failed to read header: {}", e)))?
        .clone();

    let indices = columns
        .iter()
        .map(|column| {
            headers
                .iter()
                .position(|h| h.trim() == *column)
                .ok_or_else(|| OutputError::MissingColumn((*column).to_string()))
        })
        .collect::<OutputResult<Vec<usize>>>()?;
    debug!(?indices, "Resolved column positions");

    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {}", e)))?;
        }
    }
    let file = File::create(out_path)
        .map_err(|e| OutputError::IoError(format!("Failed to create file: {}", e)))?;
    let mut writer = Writer::from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));

    writer
        .write_record(columns)
        .map_err(|e| OutputError::CsvError(format!("Failed to write header: {}", e)))?;

    let mut rows = 0u64;
    for record in reader.records() {
        let record =
            record.map_err(|e| OutputError::CsvError(format!("Failed to read row: {}", e)))?;
        let projected = indices.iter().map(|&i| record.get(i).unwrap_or(""));
        writer
            .write_record(projected)
            .map_err(|e| OutputError::CsvError(format!("Failed to write row: {}", e)))?;
        rows += 1;
    }

    writer
        .flush()
        .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))?;

    info!(path = %out_path.display(), rows, columns = columns.len(), "Reduced table written");
    Ok(rows)
}
