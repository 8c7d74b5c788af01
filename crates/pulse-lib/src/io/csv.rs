use crate::error::{PulseError, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Load one named column of a headed CSV file as `f64` samples.
///
/// Empty cells become NaN so the detectors' NaN cleaning can deal with them.
pub fn read_column(path: &Path, column: &str, delimiter: u8) -> Result<Vec<f64>> {
    let file = File::open(path)?;
    read_column_from(file, column, delimiter)
}

pub fn read_column_from<R: Read>(source: R, column: &str, delimiter: u8) -> Result<Vec<f64>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(source);
    let headers = reader.headers().map_err(csv_error)?.clone();
    let idx = locate_column(&headers, column)?;

    let mut out = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(csv_error)?;
        let cell = record.get(idx).unwrap_or("");
        let value = if cell.is_empty() {
            f64::NAN
        } else {
            cell.parse::<f64>().map_err(|_| {
                PulseError::Parse(format!("row {} of '{}' is not f64: {}", row + 1, column, cell))
            })?
        };
        out.push(value);
    }
    if out.is_empty() {
        return Err(PulseError::InvalidInput(format!("column '{}' has no rows", column)));
    }
    Ok(out)
}

fn locate_column(headers: &StringRecord, requested: &str) -> Result<usize> {
    headers
        .iter()
        .position(|name| name.eq_ignore_ascii_case(requested))
        .ok_or_else(|| {
            PulseError::InvalidInput(format!(
                "missing column '{}' (found: {})",
                requested,
                headers.iter().collect::<Vec<_>>().join(", ")
            ))
        })
}

fn csv_error(err: csv::Error) -> PulseError {
    PulseError::Parse(err.to_string())
}
