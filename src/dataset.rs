//! Dataset loading.
//!
//! Reads tabular car records from CSV (header row required), a JSON array of
//! objects, or JSON Lines. The format is chosen by file extension. Keys are
//! left as-is here; [`crate::document::normalize_record`] canonicalizes them.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::error::{RagError, Result};
use crate::models::{MetaValue, RawRecord};

pub fn load_records(path: &Path) -> Result<Vec<RawRecord>> {
    if !path.exists() {
        return Err(RagError::Dataset(format!("{} not found", path.display())));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let records = match ext.as_str() {
        "csv" => read_csv(File::open(path)?)?,
        "json" => read_json(File::open(path)?)?,
        "jsonl" | "ndjson" => read_json_lines(File::open(path)?)?,
        other => {
            return Err(RagError::Dataset(format!(
                "unsupported dataset format '{}': expected csv, json, or jsonl",
                other
            )))
        }
    };

    debug!(path = %path.display(), records = records.len(), "dataset loaded");
    Ok(records)
}

pub fn read_csv<R: std::io::Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut records = Vec::new();

    for (position, row) in rdr.records().enumerate() {
        let row = row?;
        let fields = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), row.get(i).and_then(MetaValue::parse)));
        records.push(RawRecord::new(position, fields));
    }

    Ok(records)
}

pub fn read_json<R: std::io::Read>(reader: R) -> Result<Vec<RawRecord>> {
    let value: serde_json::Value = serde_json::from_reader(reader)?;
    let rows = value
        .as_array()
        .ok_or_else(|| RagError::Dataset("JSON dataset must be an array of objects".into()))?;

    rows.iter()
        .enumerate()
        .map(|(position, row)| json_row(position, row))
        .collect()
}

pub fn read_json_lines<R: std::io::Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut records = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(&line)?;
        records.push(json_row(records.len(), &value)?);
    }
    Ok(records)
}

fn json_row(position: usize, row: &serde_json::Value) -> Result<RawRecord> {
    let obj = row
        .as_object()
        .ok_or_else(|| RagError::Dataset(format!("row {} is not a JSON object", position)))?;
    Ok(RawRecord::new(
        position,
        obj.iter().map(|(k, v)| (k.clone(), MetaValue::from_json(v))),
    ))
}
