//! Boundary adapters between files on disk and the engine's [`Dataset`].

pub mod excel_read;
pub mod excel_write;
pub mod json;

use std::path::Path;

use crate::category::{CategoryDocument, CategoryIndexMap};
use crate::error::{MergeError, Result};
use crate::model::Dataset;

/// Sheet holding the persisted category mapping inside a workbook.
pub const CATEGORIES_SHEET: &str = "Categories";

/// A gradebook as loaded from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedGradebook {
    pub dataset: Dataset,
    /// Category mapping stored alongside the data, if any.
    pub categories: Option<CategoryDocument>,
}

/// File formats a gradebook can be read from or written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Excel,
    Json,
}

/// Infers the sheet format from the file extension.
pub fn detect_format(path: &Path) -> Option<SheetFormat> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "xlsx" | "xlsm" => Some(SheetFormat::Excel),
        "json" => Some(SheetFormat::Json),
        _ => None,
    }
}

/// Loads a gradebook, choosing the reader from the file extension.
pub fn load_gradebook(path: &Path, sheet: Option<&str>) -> Result<LoadedGradebook> {
    match detect_format(path) {
        Some(SheetFormat::Excel) => excel_read::read_gradebook(path, sheet),
        Some(SheetFormat::Json) => Ok(LoadedGradebook {
            dataset: json::read_sheet(path)?,
            categories: None,
        }),
        None => Err(MergeError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Writes a gradebook, choosing the writer from the file extension. JSON
/// output carries only the data; the category document is written separately.
pub fn save_gradebook(path: &Path, dataset: &Dataset, map: &CategoryIndexMap) -> Result<()> {
    save_gradebook_as(path, None, dataset, map)
}

/// Writes a gradebook in `format`, or in the format implied by the extension
/// when none is given.
pub fn save_gradebook_as(
    path: &Path,
    format: Option<SheetFormat>,
    dataset: &Dataset,
    map: &CategoryIndexMap,
) -> Result<()> {
    match format.or_else(|| detect_format(path)) {
        Some(SheetFormat::Excel) => excel_write::write_gradebook(path, dataset, map),
        Some(SheetFormat::Json) => json::write_json(path, dataset),
        None => Err(MergeError::UnsupportedFormat(path.to_path_buf())),
    }
}
