//! Plans and applies the merge of an imported sheet into an existing gradebook.
//!
//! [`plan`] produces a [`MergeDecision`] for a person to review; [`apply`]
//! turns an approved decision into a new dataset and category map without
//! touching its inputs.

mod apply;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::category::CategoryIndexMap;
use crate::classify::ColumnClassifier;
use crate::error::Result;
use crate::matcher::{IdentityIndex, StudentMatch};
use crate::model::{CategoryId, Dataset};

pub use apply::apply;

/// Reviewable plan for combining two datasets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeDecision {
    /// Non-identity headers present in both datasets.
    pub duplicate_columns: Vec<String>,
    /// Headers whose incoming values replace the current ones.
    #[serde(default)]
    pub columns_to_override: Vec<String>,
    /// Non-identity headers only the incoming dataset has.
    pub new_columns: Vec<String>,
    pub category_assignment: BTreeMap<String, CategoryId>,
    pub matches: Vec<StudentMatch>,
    /// Identity headers of the current dataset used for matching.
    pub current_identity_columns: Vec<String>,
    /// Identity headers of the incoming dataset used for matching.
    pub incoming_identity_columns: Vec<String>,
}

impl MergeDecision {
    /// Marks `header` for override. Validity is checked by [`apply`].
    pub fn override_column(mut self, header: impl Into<String>) -> Self {
        let header = header.into();
        if !self.columns_to_override.contains(&header) {
            self.columns_to_override.push(header);
        }
        self
    }

    /// Overrides every duplicate column with the incoming values.
    pub fn override_all_duplicates(mut self) -> Self {
        for header in self.duplicate_columns.clone() {
            if !self.columns_to_override.contains(&header) {
                self.columns_to_override.push(header);
            }
        }
        self
    }

    pub fn matched(&self) -> impl Iterator<Item = &StudentMatch> {
        self.matches.iter().filter(|m| m.is_matched())
    }

    pub fn unmatched(&self) -> impl Iterator<Item = &StudentMatch> {
        self.matches.iter().filter(|m| !m.is_matched())
    }

    /// Matches a person should confirm before applying.
    pub fn needs_review(&self) -> impl Iterator<Item = &StudentMatch> {
        self.matches.iter().filter(|m| m.needs_review())
    }

    pub fn summary(&self) -> MergeSummary {
        MergeSummary {
            matched: self.matched().count(),
            unmatched: self.unmatched().count(),
            needs_review: self.needs_review().count(),
            duplicate_columns: self.duplicate_columns.len(),
            new_columns: self.new_columns.len(),
            overridden_columns: self.columns_to_override.len(),
        }
    }
}

/// Counts describing a decision, for logs and review screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSummary {
    pub matched: usize,
    pub unmatched: usize,
    pub needs_review: usize,
    pub duplicate_columns: usize,
    pub new_columns: usize,
    pub overridden_columns: usize,
}

/// Builds a merge decision for importing `incoming` into `current`.
///
/// Identity columns of `current` are the ones `current_map` files under
/// `student`; identity columns of `incoming` use the persisted category for
/// headers the current map knows and the classifier for the rest.
pub fn plan(
    current: &Dataset,
    current_map: &CategoryIndexMap,
    incoming: &Dataset,
    classifier: &ColumnClassifier,
) -> Result<MergeDecision> {
    current_map.check_partition(current.column_count())?;

    let known = current_map.assignments(&current.headers);
    let current_identity = current.headers_at(current_map.indices(&CategoryId::Student))?;
    let incoming_identity: Vec<String> = incoming
        .headers
        .iter()
        .filter(|header| classifier.classify_known(header, &known) == CategoryId::Student)
        .cloned()
        .collect();
    let identity: BTreeSet<&str> = current_identity
        .iter()
        .chain(incoming_identity.iter())
        .map(String::as_str)
        .collect();

    let mut duplicate_columns = Vec::new();
    let mut new_columns = Vec::new();
    let mut category_assignment = BTreeMap::new();
    for header in &incoming.headers {
        if identity.contains(header.as_str()) {
            continue;
        }
        let category = classifier.classify_known(header, &known);
        if current.has_column(header) {
            duplicate_columns.push(header.clone());
        } else {
            new_columns.push(header.clone());
        }
        debug!(column = %header, %category, "assigned category");
        category_assignment.insert(header.clone(), category);
    }

    let index = IdentityIndex::build_by_name(current, &current_identity);
    let matches = index.match_all_by_name(incoming, &incoming_identity);

    let decision = MergeDecision {
        duplicate_columns,
        columns_to_override: Vec::new(),
        new_columns,
        category_assignment,
        matches,
        current_identity_columns: current_identity,
        incoming_identity_columns: incoming_identity,
    };
    let summary = decision.summary();
    info!(
        matched = summary.matched,
        unmatched = summary.unmatched,
        needs_review = summary.needs_review,
        duplicate_columns = summary.duplicate_columns,
        new_columns = summary.new_columns,
        "merge planned"
    );
    Ok(decision)
}
