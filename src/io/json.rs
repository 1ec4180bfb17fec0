use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::category::CategoryDocument;
use crate::error::Result;
use crate::merge::MergeDecision;
use crate::model::Dataset;
use crate::normalize::SheetInput;

/// Reads a `{ headers, rows }` sheet and normalises it.
pub fn read_sheet(path: &Path) -> Result<Dataset> {
    let input: SheetInput = read_json(path)?;
    input.normalize()
}

pub fn read_categories(path: &Path) -> Result<CategoryDocument> {
    read_json(path)
}

pub fn read_decision(path: &Path) -> Result<MergeDecision> {
    read_json(path)
}

/// Writes any serialisable value as pretty-printed JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json_string = serde_json::to_string_pretty(value)?;
    fs::write(path, json_string)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
