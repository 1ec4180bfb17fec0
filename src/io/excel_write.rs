use std::path::Path;

use rust_xlsxwriter::{Workbook, Worksheet};

use crate::category::{CategoryDocument, CategoryIndexMap};
use crate::error::Result;
use crate::io::CATEGORIES_SHEET;
use crate::model::{CellValue, Dataset};

/// Name of the sheet holding student rows.
pub const GRADES_SHEET: &str = "Grades";

/// Writes the dataset to a grades sheet and its category mapping to a
/// [`CATEGORIES_SHEET`] sheet.
pub fn write_gradebook(path: &Path, dataset: &Dataset, map: &CategoryIndexMap) -> Result<()> {
    let mut workbook_writer = Workbook::new();

    let worksheet = workbook_writer.add_worksheet();
    worksheet.set_name(GRADES_SHEET)?;
    write_grades(worksheet, dataset)?;

    let worksheet = workbook_writer.add_worksheet();
    worksheet.set_name(CATEGORIES_SHEET)?;
    write_categories(worksheet, &CategoryDocument::from_index_map(map, &dataset.headers))?;

    workbook_writer.save(path)?;
    Ok(())
}

fn write_grades(worksheet: &mut Worksheet, dataset: &Dataset) -> Result<()> {
    for (col_idx, header) in dataset.headers.iter().enumerate() {
        worksheet.write_string(0, col_idx as u16, header)?;
    }

    for (row_idx, row) in dataset.rows.iter().enumerate() {
        let excel_row = (row_idx + 1) as u32;
        for (col_idx, header) in dataset.headers.iter().enumerate() {
            match row.get(header) {
                Some(CellValue::Number(value)) => {
                    worksheet.write_number(excel_row, col_idx as u16, *value)?;
                }
                Some(CellValue::Text(value)) | Some(CellValue::Date(value)) => {
                    worksheet.write_string(excel_row, col_idx as u16, value)?;
                }
                Some(CellValue::Null) | None => {}
            }
        }
    }

    if !dataset.headers.is_empty() {
        let col_end = (dataset.headers.len() as u16).saturating_sub(1);
        let row_end = dataset.rows.len() as u32;
        worksheet.autofilter(0, 0, row_end, col_end)?;
        worksheet.set_freeze_panes(1, 0)?;
    }
    Ok(())
}

fn write_categories(worksheet: &mut Worksheet, document: &CategoryDocument) -> Result<()> {
    for (col_idx, header) in ["id", "name", "column"].iter().enumerate() {
        worksheet.write_string(0, col_idx as u16, *header)?;
    }

    let mut row_idx = 1u32;
    for entry in &document.categories {
        if entry.columns.is_empty() {
            worksheet.write_string(row_idx, 0, &entry.id)?;
            worksheet.write_string(row_idx, 1, &entry.name)?;
            row_idx += 1;
            continue;
        }
        for column in &entry.columns {
            worksheet.write_string(row_idx, 0, &entry.id)?;
            worksheet.write_string(row_idx, 1, &entry.name)?;
            worksheet.write_string(row_idx, 2, column)?;
            row_idx += 1;
        }
    }
    Ok(())
}
