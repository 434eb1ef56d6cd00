use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, de};
use std::path::Path;

use super::DiseaseRecord;

/// Read the disease table. Columns are matched by header name; extra
/// columns are ignored.
pub fn read_records(path: &Path) -> Result<Vec<DiseaseRecord>> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)
        .with_context(|| format!("opening disease table {}", path.display()))?;
    parse_records(reader).with_context(|| format!("reading disease table {}", path.display()))
}

/// Parse a disease table already held in memory.
pub fn parse_bytes(bytes: &[u8]) -> Result<Vec<DiseaseRecord>> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(bytes);
    parse_records(reader)
}

fn parse_records<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<DiseaseRecord>> {
    reader
        .deserialize::<DiseaseRecord>()
        .enumerate()
        // Row numbers are 1-based and exclude the header.
        .map(|(i, row)| row.with_context(|| format!("parsing row {}", i + 1)))
        .collect()
}

/// Parse a boolean cell as written by pandas, spreadsheets or by hand.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "1.0" => Some(true),
        "false" | "f" | "no" | "n" | "0" | "0.0" => Some(false),
        _ => None,
    }
}

pub(crate) fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_flag(&raw).ok_or_else(|| de::Error::custom(format!("invalid boolean flag {raw:?}")))
}
