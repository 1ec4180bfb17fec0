//! Column edits that keep a dataset and its category map in step.

use tracing::debug;

use crate::category::CategoryIndexMap;
use crate::error::{MergeError, Result};
use crate::model::{CategoryId, CellValue, Dataset};

/// Adds an empty column named `header` to `category`.
///
/// With `at` unset the column lands after the category's last column, or at
/// the end of the sheet for a category without columns.
pub fn add_column(
    dataset: &Dataset,
    map: &CategoryIndexMap,
    category: &CategoryId,
    header: &str,
    at: Option<usize>,
) -> Result<(Dataset, CategoryIndexMap)> {
    map.check_partition(dataset.column_count())?;

    let header = header.trim();
    if header.is_empty() {
        return Err(MergeError::MalformedSheet("column name is blank".into()));
    }
    if dataset.has_column(header) {
        return Err(MergeError::DuplicateColumn(header.to_string()));
    }

    let at = at.unwrap_or_else(|| map.insertion_point(category, dataset.column_count()));
    if at > dataset.column_count() {
        return Err(MergeError::ColumnNotFound(format!(
            "position {at} is past the end of a sheet with {} columns",
            dataset.column_count()
        )));
    }

    let mut headers = dataset.headers.clone();
    headers.insert(at, header.to_string());
    let rows = dataset
        .rows
        .iter()
        .map(|row| {
            let mut row = row.clone();
            row.insert(header.to_string(), CellValue::Null);
            row
        })
        .collect();

    let next_map = map.insert_column(category, at);
    next_map.check_partition(headers.len())?;
    debug!(column = %header, %category, at, "added column");
    Ok((Dataset::new(headers, rows)?, next_map))
}

/// Deletes the column named `header` and its values.
pub fn delete_column(
    dataset: &Dataset,
    map: &CategoryIndexMap,
    header: &str,
) -> Result<(Dataset, CategoryIndexMap)> {
    map.check_partition(dataset.column_count())?;

    let index = dataset
        .column_index(header)
        .ok_or_else(|| MergeError::ColumnNotFound(header.to_string()))?;

    let mut headers = dataset.headers.clone();
    headers.remove(index);
    let rows = dataset
        .rows
        .iter()
        .map(|row| {
            let mut row = row.clone();
            row.remove(header);
            row
        })
        .collect();

    let next_map = map.remove_column(index);
    next_map.check_partition(headers.len())?;
    debug!(column = %header, index, "deleted column");
    Ok((Dataset::new(headers, rows)?, next_map))
}
