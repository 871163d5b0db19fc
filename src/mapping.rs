//! Load the tab-separated sample metadata table
//!
//! The orchestrator describes each preparation with a QIIME-style mapping
//! file: a tab-separated table whose header row starts with `#SampleID` and
//! contains a `run_prefix` column. Only the run prefix -> sample name mapping
//! is of interest here; run prefixes must be unique because the pairing step
//! matches them against forward read filenames.

use std::collections::BTreeMap;
use std::path::Path;

use log::info;
use thiserror::Error;

const SAMPLE_COLUMN: &str = "#SampleID";
const PREFIX_COLUMN: &str = "run_prefix";

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Mapping file has no {0} column")]
    MissingColumn(&'static str),

    #[error("Mapping file reuses run prefix: {0}")]
    DuplicatePrefix(String),

    #[error("Can't parse mapping file: {0}")]
    Malformed(#[from] csv::Error),
}

/// Read the mapping file into a run prefix -> sample name table
pub fn sample_names_by_run_prefix(
    map_file: &Path,
) -> Result<BTreeMap<String, String>, MappingError> {
    info!("Reading mapping file {}", map_file.display());
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(map_file)?;

    let headers = reader.headers()?.clone();
    let sample_col = headers
        .iter()
        .position(|h| h == SAMPLE_COLUMN)
        .ok_or(MappingError::MissingColumn(SAMPLE_COLUMN))?;
    let prefix_col = headers
        .iter()
        .position(|h| h == PREFIX_COLUMN)
        .ok_or(MappingError::MissingColumn(PREFIX_COLUMN))?;

    let mut table = BTreeMap::new();
    for record in reader.records() {
        let record = record?;
        let prefix = record.get(prefix_col).unwrap_or_default();
        let sample = record.get(sample_col).unwrap_or_default();
        if table.insert(prefix.to_string(), sample.to_string()).is_some() {
            return Err(MappingError::DuplicatePrefix(prefix.to_string()));
        }
    }

    Ok(table)
}
