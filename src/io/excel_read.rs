use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use chrono::{Duration, NaiveDate};

use crate::category::{CategoryDocument, CategoryEntry};
use crate::error::{MergeError, Result};
use crate::io::{CATEGORIES_SHEET, LoadedGradebook};
use crate::model::CellValue;
use crate::normalize::{RawRow, normalize};

/// Largest serial Excel accepts as a date (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Reads a gradebook sheet from an Excel workbook.
///
/// The first row holds the headers and every later row is a student. Fully
/// blank rows are skipped. When `sheet` is `None` the first sheet other than
/// [`CATEGORIES_SHEET`] is used.
pub fn read_gradebook(path: &Path, sheet: Option<&str>) -> Result<LoadedGradebook> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet_names = workbook.sheet_names().to_vec();

    let data_sheet = match sheet {
        Some(name) => name.to_string(),
        None => sheet_names
            .iter()
            .find(|name| name.as_str() != CATEGORIES_SHEET)
            .cloned()
            .ok_or_else(|| MergeError::MissingSheet("<first data sheet>".into()))?,
    };

    let range = read_required_sheet(&mut workbook, &data_sheet)?;
    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(first_row) => trim_trailing_blank(
            first_row
                .iter()
                .map(|cell| cell_to_string(Some(cell)))
                .collect(),
        ),
        None => Vec::new(),
    };

    let raw_rows: Vec<RawRow> = rows
        .map(|row| row.iter().map(cell_to_value).collect::<Vec<_>>())
        .filter(|cells| cells.iter().any(|cell| !cell.is_null()))
        .map(RawRow::Positional)
        .collect();
    let dataset = normalize(&raw_rows, &headers)?;

    let categories = if sheet_names.iter().any(|name| name == CATEGORIES_SHEET) {
        let range = read_required_sheet(&mut workbook, CATEGORIES_SHEET)?;
        Some(parse_categories(&range))
    } else {
        None
    };

    Ok(LoadedGradebook {
        dataset,
        categories,
    })
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<calamine::Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| MergeError::MissingSheet(name.to_string()))?;
    let range = range_result.map_err(MergeError::from)?;
    Ok(range)
}

fn parse_categories(range: &calamine::Range<DataType>) -> CategoryDocument {
    let mut categories: Vec<CategoryEntry> = Vec::new();

    for row in range.rows().skip(1) {
        let id = cell_to_string(row.first());
        if id.is_empty() {
            continue;
        }
        let name = cell_to_string(row.get(1));
        let column = cell_to_string(row.get(2));

        let position = categories.iter().position(|entry| entry.id == id);
        let entry = match position {
            Some(idx) => &mut categories[idx],
            None => {
                categories.push(CategoryEntry {
                    id: id.clone(),
                    name: if name.is_empty() { id.clone() } else { name },
                    columns: Vec::new(),
                });
                let last = categories.len() - 1;
                &mut categories[last]
            }
        };
        if !column.is_empty() {
            entry.columns.push(column);
        }
    }

    CategoryDocument { categories }
}

fn trim_trailing_blank(mut headers: Vec<String>) -> Vec<String> {
    while headers.last().is_some_and(|header| header.trim().is_empty()) {
        headers.pop();
    }
    headers
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.trim().to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => cell_to_value(other).display_text(),
    }
}

fn cell_to_value(cell: &DataType) -> CellValue {
    match cell {
        DataType::Empty => CellValue::Null,
        DataType::String(value) => CellValue::Text(value.clone()).normalized(),
        DataType::Float(value) => CellValue::Number(*value),
        DataType::Int(value) => CellValue::Number(*value as f64),
        DataType::Bool(value) => CellValue::Text(value.to_string()),
        DataType::DateTime(serial) => excel_serial_to_date(*serial)
            .map(CellValue::Date)
            .unwrap_or(CellValue::Number(*serial)),
        other => CellValue::Text(other.to_string()).normalized(),
    }
}

/// Renders an Excel date serial (1900 system) as an ISO date, with a time
/// part only when the serial has one.
fn excel_serial_to_date(serial: f64) -> Option<String> {
    if !(0.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    let moment = epoch.checked_add_signed(Duration::seconds(seconds))?;
    if seconds % 86_400 == 0 {
        Some(moment.format("%Y-%m-%d").to_string())
    } else {
        Some(moment.format("%Y-%m-%dT%H:%M:%S").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excel_serials_render_as_iso_dates() {
        assert_eq!(excel_serial_to_date(45_292.0).as_deref(), Some("2024-01-01"));
        assert_eq!(
            excel_serial_to_date(45_292.5).as_deref(),
            Some("2024-01-01T12:00:00")
        );
        assert_eq!(excel_serial_to_date(-1.0), None);
    }
}
