//! Reader for dose-response observation tables
//!
//! Tables are headered CSV, one observation per row. Headers are matched
//! case-insensitively and lines starting with `#` are skipped.
//!
//! | Column | Aliases |
//! |--------|---------|
//! | pre_incubation_time | preincubation_time, pre_inc_time |
//! | incubation_time | inc_time |
//! | inhibitor_conc | inhibitor, inhibitor_concentration |
//! | signal | observed_signal |
//!
//! The shared assay constants are not part of the table; they are supplied
//! programmatically when the [Dataset](crate::data::Dataset) is built.

use serde::Deserialize;
use thiserror::Error;

use crate::data::structs::{DataError, Observation};

/// Errors produced while reading an observation table
#[derive(Error, Debug)]
pub enum TableError {
    /// The file could not be read or a row did not match the expected shape
    #[error("CSV error: {0}")]
    ReadError(#[from] csv::Error),
    /// A row parsed but failed validation
    #[error("Invalid observation in row {row}: {source}")]
    InvalidRow { row: usize, source: DataError },
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(alias = "preincubation_time", alias = "pre_inc_time")]
    pre_incubation_time: f64,
    #[serde(alias = "inc_time")]
    incubation_time: f64,
    #[serde(alias = "inhibitor", alias = "inhibitor_concentration")]
    inhibitor_conc: f64,
    #[serde(alias = "observed_signal")]
    signal: f64,
}

/// Read an observation table from a CSV file
///
/// Rows are validated through [Observation::new]; the first invalid row
/// aborts the read with its row number.
pub fn read_table(path: impl Into<String>) -> Result<Vec<Observation>, TableError> {
    let path = path.into();

    let reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .has_headers(true)
        .from_path(path)?;

    parse_rows(reader)
}

/// Read an observation table from any [std::io::Read] source
pub fn read_table_from<R: std::io::Read>(source: R) -> Result<Vec<Observation>, TableError> {
    let reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .has_headers(true)
        .from_reader(source);

    parse_rows(reader)
}

fn parse_rows<R: std::io::Read>(
    mut reader: csv::Reader<R>,
) -> Result<Vec<Observation>, TableError> {
    // Convert headers to lowercase
    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.to_lowercase())
        .collect::<Vec<_>>();
    reader.set_headers(csv::StringRecord::from(headers));

    let mut observations = Vec::new();
    for (index, row_result) in reader.deserialize().enumerate() {
        let row: Row = row_result?;
        let observation = Observation::new(
            row.pre_incubation_time,
            row.incubation_time,
            row.inhibitor_conc,
            row.signal,
        )
        .map_err(|source| TableError::InvalidRow {
            row: index + 1,
            source,
        })?;
        observations.push(observation);
    }

    Ok(observations)
}
