//! Category → column index bookkeeping.
//!
//! Categories store flat index lists rather than ranges, so any structural
//! edit has to rebase every category in the same step. All operations return
//! a new map and leave the receiver untouched.

mod document;

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::classify::ColumnClassifier;
use crate::error::{MergeError, Result};
use crate::model::CategoryId;

pub use document::{CategoryDocument, CategoryEntry};

/// Mapping from category to the ascending column indices it owns.
#[derive(Debug, Clone, Default, Eq)]
pub struct CategoryIndexMap {
    categories: BTreeMap<CategoryId, Vec<usize>>,
}

impl PartialEq for CategoryIndexMap {
    /// Categories without columns compare equal to absent ones.
    fn eq(&self, other: &Self) -> bool {
        let lhs = self.categories.iter().filter(|(_, idx)| !idx.is_empty());
        let rhs = other.categories.iter().filter(|(_, idx)| !idx.is_empty());
        lhs.eq(rhs)
    }
}

impl CategoryIndexMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map straight from index lists. Lists are sorted and deduplicated
    /// per category; the partition is not checked.
    pub fn from_indices<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (CategoryId, Vec<usize>)>,
    {
        let mut categories: BTreeMap<CategoryId, Vec<usize>> = BTreeMap::new();
        for (category, indices) in entries {
            let slot = categories.entry(category).or_default();
            slot.extend(indices);
            slot.sort_unstable();
            slot.dedup();
        }
        Self { categories }
    }

    /// Resolves header names to positions in `headers`.
    ///
    /// Names missing from `headers` are stale entries and are dropped with a
    /// warning. A header claimed by more than one category stays with the
    /// category that comes first in `categories` order.
    pub fn from_categorized_columns(
        categories: &BTreeMap<CategoryId, Vec<String>>,
        headers: &[String],
    ) -> Self {
        let positions: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| (header.as_str(), idx))
            .collect();
        let mut claimed: HashMap<usize, &CategoryId> = HashMap::new();
        let mut resolved: BTreeMap<CategoryId, Vec<usize>> = BTreeMap::new();

        for (category, columns) in categories {
            let slot = resolved.entry(category.clone()).or_default();
            for column in columns {
                let Some(&idx) = positions.get(column.as_str()) else {
                    warn!(%category, column = %column, "dropping stale category entry");
                    continue;
                };
                if let Some(owner) = claimed.get(&idx) {
                    warn!(
                        %category,
                        column = %column,
                        owner = %owner,
                        "column already assigned to another category"
                    );
                    continue;
                }
                claimed.insert(idx, category);
                slot.push(idx);
            }
            slot.sort_unstable();
            slot.dedup();
        }

        Self {
            categories: resolved,
        }
    }

    /// Indices in `[0, headers.len())` that no category owns.
    pub fn unassigned_columns(&self, headers: &[String]) -> Vec<usize> {
        let mut owned = vec![false; headers.len()];
        for idx in self.categories.values().flatten() {
            if let Some(slot) = owned.get_mut(*idx) {
                *slot = true;
            }
        }
        owned
            .iter()
            .enumerate()
            .filter_map(|(idx, taken)| (!taken).then_some(idx))
            .collect()
    }

    /// Routes every unassigned column through `classifier` and returns the
    /// completed map.
    pub fn complete(&self, headers: &[String], classifier: &ColumnClassifier) -> Self {
        let mut next = self.clone();
        for idx in self.unassigned_columns(headers) {
            let category = classifier.classify(&headers[idx]);
            debug!(column = %headers[idx], %category, "classified unassigned column");
            let slot = next.categories.entry(category).or_default();
            slot.push(idx);
            slot.sort_unstable();
        }
        next
    }

    /// Shifts every index `>= at` up by one across all categories, then gives
    /// `at` to `category`.
    pub fn insert_column(&self, category: &CategoryId, at: usize) -> Self {
        let mut categories: BTreeMap<CategoryId, Vec<usize>> = self
            .categories
            .iter()
            .map(|(id, indices)| {
                let shifted = indices
                    .iter()
                    .map(|&idx| if idx >= at { idx + 1 } else { idx })
                    .collect();
                (id.clone(), shifted)
            })
            .collect();

        let slot = categories.entry(category.clone()).or_default();
        let position = slot.partition_point(|&idx| idx < at);
        slot.insert(position, at);

        Self { categories }
    }

    /// Removes `index` from whichever category owns it, then shifts every
    /// greater index down by one across all categories.
    pub fn remove_column(&self, index: usize) -> Self {
        let categories = self
            .categories
            .iter()
            .map(|(id, indices)| {
                let rebased = indices
                    .iter()
                    .filter(|&&idx| idx != index)
                    .map(|&idx| if idx > index { idx - 1 } else { idx })
                    .collect();
                (id.clone(), rebased)
            })
            .collect();

        Self { categories }
    }

    /// Checks that the categories partition `[0, column_count)`: every column
    /// owned exactly once, nothing out of range.
    pub fn check_partition(&self, column_count: usize) -> Result<()> {
        let mut owners: Vec<Option<&CategoryId>> = vec![None; column_count];
        for (category, indices) in &self.categories {
            for &idx in indices {
                let Some(slot) = owners.get_mut(idx) else {
                    return Err(MergeError::InvalidCategoryMap(format!(
                        "category '{category}' holds index {idx} but the sheet has {column_count} columns"
                    )));
                };
                if let Some(owner) = *slot {
                    return Err(MergeError::InvalidCategoryMap(format!(
                        "index {idx} is held by both '{owner}' and '{category}'"
                    )));
                }
                *slot = Some(category);
            }
        }

        if let Some(gap) = owners.iter().position(Option::is_none) {
            return Err(MergeError::InvalidCategoryMap(format!(
                "column {gap} belongs to no category"
            )));
        }
        Ok(())
    }

    /// Where a new column for `category` goes: one past its last column, or
    /// the end of the sheet when the category has none yet.
    pub fn insertion_point(&self, category: &CategoryId, column_count: usize) -> usize {
        self.indices(category)
            .last()
            .map(|&idx| idx + 1)
            .unwrap_or(column_count)
    }

    /// Ascending indices owned by `category`.
    pub fn indices(&self, category: &CategoryId) -> &[usize] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn category_of(&self, index: usize) -> Option<&CategoryId> {
        self.categories
            .iter()
            .find(|(_, indices)| indices.binary_search(&index).is_ok())
            .map(|(category, _)| category)
    }

    /// Header name → category for every owned index within `headers`.
    pub fn assignments(&self, headers: &[String]) -> BTreeMap<String, CategoryId> {
        self.categories
            .iter()
            .flat_map(|(category, indices)| {
                indices
                    .iter()
                    .filter_map(|&idx| headers.get(idx))
                    .map(move |header| (header.clone(), category.clone()))
            })
            .collect()
    }

    /// Categories that own at least one column.
    pub fn iter(&self) -> impl Iterator<Item = (&CategoryId, &[usize])> {
        self.categories
            .iter()
            .filter(|(_, indices)| !indices.is_empty())
            .map(|(category, indices)| (category, indices.as_slice()))
    }

    /// Total number of owned indices.
    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
