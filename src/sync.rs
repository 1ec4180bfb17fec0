use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::category::{CategoryDocument, CategoryIndexMap};
use crate::classify::ColumnClassifier;
use crate::error::{MergeError, Result};
use crate::io::{self, LoadedGradebook, SheetFormat, json};
use crate::merge::{self, MergeDecision};
use crate::model::{CategoryId, Dataset};

/// A dataset together with its complete category map.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradebook {
    pub dataset: Dataset,
    pub categories: CategoryIndexMap,
}

/// Loads a gradebook and resolves its category map.
///
/// An explicit `categories` file wins over a mapping stored inside the
/// workbook. Columns the mapping does not cover are classified.
#[instrument(level = "info", skip_all, fields(input = %input.display()))]
pub fn load_gradebook(
    input: &Path,
    sheet: Option<&str>,
    categories: Option<&Path>,
    classifier: &ColumnClassifier,
) -> Result<Gradebook> {
    require_input(input)?;
    let LoadedGradebook {
        dataset,
        categories: embedded,
    } = io::load_gradebook(input, sheet)?;

    let document = match categories {
        Some(path) => {
            require_input(path)?;
            Some(json::read_categories(path)?)
        }
        None => embedded,
    };

    let categories = resolve_categories(&dataset, document.as_ref(), classifier);
    info!(
        rows = dataset.rows.len(),
        columns = dataset.column_count(),
        "loaded gradebook"
    );
    Ok(Gradebook {
        dataset,
        categories,
    })
}

/// Rebuilds the index map from a persisted document (if any) and classifies
/// whatever it leaves unassigned.
pub fn resolve_categories(
    dataset: &Dataset,
    document: Option<&CategoryDocument>,
    classifier: &ColumnClassifier,
) -> CategoryIndexMap {
    let persisted = document
        .map(|document| document.to_index_map(&dataset.headers))
        .unwrap_or_default();
    let unassigned = persisted.unassigned_columns(&dataset.headers);
    if document.is_some() && !unassigned.is_empty() {
        warn!(
            count = unassigned.len(),
            "persisted categories do not cover every column; classifying the rest"
        );
    }
    persisted.complete(&dataset.headers, classifier)
}

/// Lists each header of a gradebook with its category, in sheet order.
#[instrument(level = "info", skip_all, fields(input = %input.display()))]
pub fn classify_file(
    input: &Path,
    sheet: Option<&str>,
    categories: Option<&Path>,
    classifier: &ColumnClassifier,
) -> Result<Vec<(String, CategoryId)>> {
    let gradebook = load_gradebook(input, sheet, categories, classifier)?;
    let assignments = gradebook
        .dataset
        .headers
        .iter()
        .enumerate()
        .filter_map(|(idx, header)| {
            gradebook
                .categories
                .category_of(idx)
                .map(|category| (header.clone(), category.clone()))
        })
        .collect();
    Ok(assignments)
}

/// Plans the import of `incoming` into `current` and writes the decision.
#[instrument(
    level = "info",
    skip_all,
    fields(current = %current.display(), incoming = %incoming.display(), output = %output.display())
)]
pub fn plan_files(
    current: &Path,
    incoming: &Path,
    categories: Option<&Path>,
    classifier: &ColumnClassifier,
    output: &Path,
) -> Result<MergeDecision> {
    let current_book = load_gradebook(current, None, categories, classifier)?;
    require_input(incoming)?;
    let incoming_book = io::load_gradebook(incoming, None)?;

    let decision = merge::plan(
        &current_book.dataset,
        &current_book.categories,
        &incoming_book.dataset,
        classifier,
    )?;
    json::write_json(output, &decision)?;
    debug!("decision written");
    Ok(decision)
}

/// Applies a reviewed decision and writes the merged gradebook, in `format`
/// or by the output extension. The category document is also written to
/// `categories_out` when given.
#[instrument(
    level = "info",
    skip_all,
    fields(decision = %decision.display(), output = %output.display())
)]
pub fn apply_files(
    decision: &Path,
    current: &Path,
    incoming: &Path,
    categories: Option<&Path>,
    classifier: &ColumnClassifier,
    output: &Path,
    format: Option<SheetFormat>,
    categories_out: Option<&Path>,
) -> Result<Gradebook> {
    require_input(decision)?;
    let decision = json::read_decision(decision)?;
    let current_book = load_gradebook(current, None, categories, classifier)?;
    require_input(incoming)?;
    let incoming_book = io::load_gradebook(incoming, None)?;

    let (dataset, map) = merge::apply(
        &decision,
        &current_book.dataset,
        &current_book.categories,
        &incoming_book.dataset,
    )?;

    io::save_gradebook_as(output, format, &dataset, &map)?;
    if let Some(path) = categories_out {
        json::write_json(path, &CategoryDocument::from_index_map(&map, &dataset.headers))?;
    }
    info!(rows = dataset.rows.len(), "merged gradebook written");
    Ok(Gradebook {
        dataset,
        categories: map,
    })
}

fn require_input(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(MergeError::MissingInput(path.to_path_buf()))
    }
}
