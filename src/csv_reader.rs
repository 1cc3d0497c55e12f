use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::data::Dataset;

/// Raw CSV contents: a header row plus string cells.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Read CSV data from stdin
pub fn read_csv_from_stdin() -> Result<CsvData> {
    read_csv(io::stdin().lock())
}

/// Read CSV data from a file on disk
pub fn read_csv_from_path(path: &Path) -> Result<CsvData> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open CSV file '{}'", path.display()))?;
    read_csv(file)
}

/// Read CSV data from any reader. The first record is the header row.
pub fn read_csv<R: Read>(reader: R) -> Result<CsvData> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (idx, record) in csv_reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV row {}", idx + 1))?;
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }

    Ok(CsvData { headers, rows })
}

/// Serialize a dataset back to CSV. Null cells are written empty.
pub fn write_csv(data: &Dataset) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(data.headers())
        .context("Failed to write CSV headers")?;

    for row in 0..data.n_rows() {
        let record = data.columns().iter().map(|c| c.values[row].to_string());
        writer
            .write_record(record)
            .with_context(|| format!("Failed to write CSV row {}", row + 1))?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to finish CSV output: {}", e.error()))
}
