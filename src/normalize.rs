//! Converts raw sheets into the canonical [`Dataset`] shape.
//!
//! Raw rows arrive either positionally (one array per row, zipped with the
//! header list) or already keyed by header name. The shape is decided once per
//! sheet from the first row; a sheet mixing both shapes is rejected rather than
//! coerced row by row.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MergeError, Result};
use crate::model::{CellValue, Dataset, Record};

/// A row as delivered by an import collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRow {
    /// Cells in header order.
    Positional(Vec<CellValue>),
    /// Cells keyed by header name.
    Keyed(BTreeMap<String, CellValue>),
}

impl RawRow {
    fn shape(&self) -> RowShape {
        match self {
            RawRow::Positional(_) => RowShape::Positional,
            RawRow::Keyed(_) => RowShape::Keyed,
        }
    }
}

impl From<Record> for RawRow {
    fn from(record: Record) -> Self {
        RawRow::Keyed(record)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowShape {
    Positional,
    Keyed,
}

/// Input sheet as exchanged with the upload collaborator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SheetInput {
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<RawRow>,
}

impl SheetInput {
    /// Normalises the sheet into a [`Dataset`].
    pub fn normalize(&self) -> Result<Dataset> {
        normalize(&self.rows, &self.headers)
    }
}

/// Normalises raw rows against `headers`.
///
/// Headers are trimmed and must be non-empty and unique. Every output row has
/// exactly the header keys, with absent or blank cells set to null.
pub fn normalize(rows: &[RawRow], headers: &[String]) -> Result<Dataset> {
    let headers = validate_headers(headers)?;

    let Some(first) = rows.first() else {
        return Dataset::new(headers, Vec::new());
    };
    let shape = first.shape();

    let mut records = Vec::with_capacity(rows.len());
    for (row_idx, row) in rows.iter().enumerate() {
        if row.shape() != shape {
            return Err(MergeError::MalformedSheet(format!(
                "row {row_idx} is {:?} but the sheet started with {:?} rows",
                row.shape(),
                shape
            )));
        }

        let record = match row {
            RawRow::Positional(cells) => zip_positional(row_idx, cells, &headers)?,
            RawRow::Keyed(fields) => fill_keyed(row_idx, fields, &headers)?,
        };
        records.push(record);
    }

    debug!(
        rows = records.len(),
        columns = headers.len(),
        ?shape,
        "normalised sheet"
    );
    Dataset::new(headers, records)
}

fn validate_headers(headers: &[String]) -> Result<Vec<String>> {
    if headers.is_empty() {
        return Err(MergeError::MalformedSheet("sheet has no headers".into()));
    }

    let mut seen = HashSet::new();
    let mut cleaned = Vec::with_capacity(headers.len());
    for (col_idx, header) in headers.iter().enumerate() {
        let trimmed = header.trim();
        if trimmed.is_empty() {
            return Err(MergeError::MalformedSheet(format!(
                "header at column {col_idx} is blank"
            )));
        }
        if !seen.insert(trimmed.to_string()) {
            return Err(MergeError::MalformedSheet(format!(
                "duplicate header '{trimmed}'"
            )));
        }
        cleaned.push(trimmed.to_string());
    }
    Ok(cleaned)
}

fn zip_positional(row_idx: usize, cells: &[CellValue], headers: &[String]) -> Result<Record> {
    if let Some(extra) = cells
        .iter()
        .skip(headers.len())
        .position(|cell| !cell.clone().normalized().is_null())
    {
        return Err(MergeError::MalformedSheet(format!(
            "row {row_idx} has a value in column {} beyond the {} headers",
            headers.len() + extra,
            headers.len()
        )));
    }

    Ok(headers
        .iter()
        .enumerate()
        .map(|(col_idx, header)| {
            let value = cells
                .get(col_idx)
                .cloned()
                .map(CellValue::normalized)
                .unwrap_or(CellValue::Null);
            (header.clone(), value)
        })
        .collect())
}

/// Keyed fields are resolved by their trimmed name, the same way headers are.
fn fill_keyed(
    row_idx: usize,
    fields: &BTreeMap<String, CellValue>,
    headers: &[String],
) -> Result<Record> {
    let mut by_name: BTreeMap<&str, &CellValue> = BTreeMap::new();
    for (key, value) in fields {
        let name = key.trim();
        if by_name.insert(name, value).is_some() {
            return Err(MergeError::MalformedSheet(format!(
                "row {row_idx} has more than one field named '{name}'"
            )));
        }
        if !headers.iter().any(|header| header == name) {
            warn!(row = row_idx, field = %key, "dropping field not named in headers");
        }
    }

    Ok(headers
        .iter()
        .map(|header| {
            let value = by_name
                .get(header.as_str())
                .map(|&value| value.clone().normalized())
                .unwrap_or(CellValue::Null);
            (header.clone(), value)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_blank_cells_are_tolerated() {
        let headers = vec!["Name".to_string()];
        let rows = vec![RawRow::Positional(vec![
            CellValue::from("Ana"),
            CellValue::Null,
            CellValue::from("  "),
        ])];
        let dataset = normalize(&rows, &headers).expect("normalised");
        assert_eq!(dataset.rows[0]["Name"], CellValue::from("Ana"));
    }

    #[test]
    fn headers_are_trimmed() {
        let headers = vec![" Quiz 1 ".to_string()];
        let dataset = normalize(&[], &headers).expect("normalised");
        assert_eq!(dataset.headers, vec!["Quiz 1".to_string()]);
    }

    #[test]
    fn keyed_fields_resolve_by_trimmed_name() {
        let headers = vec![" Quiz 1 ".to_string()];
        let mut fields = BTreeMap::new();
        fields.insert(" Quiz 1 ".to_string(), CellValue::Number(80.0));
        let dataset = normalize(&[RawRow::Keyed(fields)], &headers).expect("normalised");
        assert_eq!(dataset.rows[0]["Quiz 1"], CellValue::Number(80.0));
    }

    #[test]
    fn keyed_fields_colliding_after_trimming_are_rejected() {
        let headers = vec!["Quiz 1".to_string()];
        let mut fields = BTreeMap::new();
        fields.insert("Quiz 1".to_string(), CellValue::Number(80.0));
        fields.insert("Quiz 1 ".to_string(), CellValue::Number(90.0));
        let result = normalize(&[RawRow::Keyed(fields)], &headers);
        assert!(matches!(result, Err(MergeError::MalformedSheet(_))));
    }
}
