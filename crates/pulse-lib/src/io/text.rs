use crate::error::{PulseError, Result};
use std::path::Path;

fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// Parse newline-delimited floating point series, ignoring blank/comment lines.
/// `nan` entries are kept as NaN samples.
pub fn parse_f64_series(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (line_no, line) in data_lines(text) {
        let val: f64 = line
            .parse()
            .map_err(|_| PulseError::Parse(format!("line {} is not f64: {}", line_no, line)))?;
        out.push(val);
    }
    if out.is_empty() {
        return Err(PulseError::InvalidInput("no numeric samples found".into()));
    }
    Ok(out)
}

/// Read a newline-delimited floating point series from disk.
pub fn read_f64_series(path: &Path) -> Result<Vec<f64>> {
    parse_f64_series(&std::fs::read_to_string(path)?)
}

/// Parse rows of comma or whitespace separated values. Rows keep their width
/// so callers can reject anything that is not one-dimensional.
pub fn parse_f64_table(text: &str) -> Result<Vec<Vec<f64>>> {
    let mut rows = Vec::new();
    for (line_no, line) in data_lines(text) {
        let row = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|field| !field.is_empty())
            .map(|field| {
                field.parse::<f64>().map_err(|_| {
                    PulseError::Parse(format!("line {}: '{}' is not f64", line_no, field))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(PulseError::InvalidInput("no numeric samples found".into()));
    }
    Ok(rows)
}

pub fn read_f64_table(path: &Path) -> Result<Vec<Vec<f64>>> {
    parse_f64_table(&std::fs::read_to_string(path)?)
}

/// Parse newline-delimited sample indices.
pub fn parse_event_indices(text: &str) -> Result<Vec<usize>> {
    let mut out = Vec::new();
    for (line_no, line) in data_lines(text) {
        let val: usize = line.parse().map_err(|_| {
            PulseError::Parse(format!("line {} is not an integer index: {}", line_no, line))
        })?;
        out.push(val);
    }
    if out.is_empty() {
        return Err(PulseError::InvalidInput("no sample indices found".into()));
    }
    Ok(out)
}

/// Read event indices from a file.
pub fn read_event_indices(path: &Path) -> Result<Vec<usize>> {
    parse_event_indices(&std::fs::read_to_string(path)?)
}
