use std::collections::{BTreeSet, HashSet};

use tracing::{debug, info, warn};

use crate::category::CategoryIndexMap;
use crate::error::{MergeError, Result};
use crate::merge::MergeDecision;
use crate::model::{CellValue, Dataset, Record};

/// Applies an approved decision, returning the merged dataset and the rebased
/// category map.
///
/// The decision is validated in full before anything is built, so an error
/// leaves no partial result behind.
pub fn apply(
    decision: &MergeDecision,
    current: &Dataset,
    current_map: &CategoryIndexMap,
    incoming: &Dataset,
) -> Result<(Dataset, CategoryIndexMap)> {
    current_map.check_partition(current.column_count())?;
    validate(decision, current, incoming)?;

    let mut headers = current.headers.clone();
    let mut rows = current.rows.clone();
    let mut map = current_map.clone();

    for column in &decision.new_columns {
        let category = &decision.category_assignment[column];
        let at = map.insertion_point(category, headers.len());
        map = map.insert_column(category, at);
        headers.insert(at, column.clone());
        for row in &mut rows {
            row.insert(column.clone(), CellValue::Null);
        }
        debug!(column = %column, %category, at, "inserted new column");
    }

    let overrides: Vec<&String> = decision.columns_to_override.iter().collect();
    let new_columns: HashSet<&str> = decision.new_columns.iter().map(String::as_str).collect();
    let identity_pairs = identity_pairs(decision);
    let mut appended = 0usize;
    let mut updated = 0usize;

    for student in &decision.matches {
        let source = &incoming.rows[student.new_row_index];
        match student.existing_row_index {
            Some(existing) => {
                let target = &mut rows[existing];
                for &header in &overrides {
                    target.insert(header.clone(), value_of(source, header));
                }
                updated += 1;
            }
            None => {
                let mut record: Record = headers
                    .iter()
                    .map(|header| (header.clone(), CellValue::Null))
                    .collect();
                for (incoming_header, current_header) in &identity_pairs {
                    record.insert(current_header.clone(), value_of(source, incoming_header));
                }
                for &header in overrides.iter().filter(|h| new_columns.contains(h.as_str())) {
                    record.insert(header.clone(), value_of(source, header));
                }
                rows.push(record);
                appended += 1;
            }
        }
    }

    map.check_partition(headers.len())?;
    let merged = Dataset::new(headers, rows)?;
    info!(
        updated,
        appended,
        columns = merged.column_count(),
        "merge applied"
    );
    Ok((merged, map))
}

fn value_of(record: &Record, header: &str) -> CellValue {
    record.get(header).cloned().unwrap_or(CellValue::Null)
}

/// Pairs each incoming identity header with the current header it fills:
/// the same name when the current sheet has it, otherwise the unclaimed
/// current identity header at the same position.
fn identity_pairs(decision: &MergeDecision) -> Vec<(String, String)> {
    let current: &[String] = &decision.current_identity_columns;
    let by_name: BTreeSet<&str> = decision
        .incoming_identity_columns
        .iter()
        .filter(|header| current.contains(header))
        .map(String::as_str)
        .collect();

    let mut pairs = Vec::new();
    for (ordinal, header) in decision.incoming_identity_columns.iter().enumerate() {
        if by_name.contains(header.as_str()) {
            pairs.push((header.clone(), header.clone()));
            continue;
        }
        match current.get(ordinal) {
            Some(fallback) if !by_name.contains(fallback.as_str()) => {
                pairs.push((header.clone(), fallback.clone()));
            }
            _ => {
                warn!(column = %header, "identity column has no counterpart in the current sheet");
            }
        }
    }
    pairs
}

fn validate(decision: &MergeDecision, current: &Dataset, incoming: &Dataset) -> Result<()> {
    let invalid = |message: String| Err(MergeError::InvalidMergeDecision(message));

    for header in &decision.duplicate_columns {
        if !current.has_column(header) || !incoming.has_column(header) {
            return invalid(format!(
                "duplicate column '{header}' is not present in both datasets"
            ));
        }
    }

    for header in &decision.new_columns {
        if !incoming.has_column(header) {
            return invalid(format!("new column '{header}' is not in the incoming dataset"));
        }
        if current.has_column(header) {
            return invalid(format!("new column '{header}' already exists"));
        }
        if !decision.category_assignment.contains_key(header) {
            return invalid(format!("new column '{header}' has no category assignment"));
        }
    }
    let mut seen = HashSet::new();
    if let Some(repeated) = decision.new_columns.iter().find(|h| !seen.insert(h.as_str())) {
        return invalid(format!("new column '{repeated}' is listed twice"));
    }

    for header in &decision.columns_to_override {
        let known = decision.duplicate_columns.contains(header)
            || decision.new_columns.contains(header);
        if !known {
            return invalid(format!(
                "override '{header}' is neither a duplicate nor a new column"
            ));
        }
    }

    for header in decision.category_assignment.keys() {
        if !current.has_column(header) && !incoming.has_column(header) {
            return invalid(format!(
                "category assignment names '{header}', which neither dataset has"
            ));
        }
    }

    for header in &decision.current_identity_columns {
        if !current.has_column(header) {
            return invalid(format!(
                "identity column '{header}' is not in the current dataset"
            ));
        }
    }
    for header in &decision.incoming_identity_columns {
        if !incoming.has_column(header) {
            return invalid(format!(
                "identity column '{header}' is not in the incoming dataset"
            ));
        }
    }

    let mut matched_rows = HashSet::new();
    for student in &decision.matches {
        if student.new_row_index >= incoming.rows.len() {
            return invalid(format!(
                "incoming row {} does not exist",
                student.new_row_index
            ));
        }
        if !matched_rows.insert(student.new_row_index) {
            return invalid(format!(
                "incoming row {} is matched more than once",
                student.new_row_index
            ));
        }
        if let Some(existing) = student.existing_row_index {
            if existing >= current.rows.len() {
                return invalid(format!("existing row {existing} does not exist"));
            }
        }
    }

    Ok(())
}
