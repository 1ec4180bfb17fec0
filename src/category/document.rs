use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::CategoryIndexMap;
use crate::model::CategoryId;

/// Category mapping as persisted next to a gradebook. Columns are stored by
/// header name so the index map can be rebuilt against whatever headers the
/// file has when it is next opened.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryDocument {
    pub categories: Vec<CategoryEntry>,
}

/// One persisted category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub columns: Vec<String>,
}

impl CategoryDocument {
    /// Serialises `map` against `headers`. The built-in categories are always
    /// listed, followed by any custom ones.
    pub fn from_index_map(map: &CategoryIndexMap, headers: &[String]) -> Self {
        let mut categories: Vec<CategoryEntry> = CategoryId::BUILT_IN
            .iter()
            .map(|category| entry_for(category, map, headers))
            .collect();

        categories.extend(
            map.iter()
                .filter(|(category, _)| matches!(category, CategoryId::Custom(_)))
                .map(|(category, _)| entry_for(category, map, headers)),
        );

        Self { categories }
    }

    /// Rebuilds the index map against the current `headers`, dropping entries
    /// whose columns no longer exist.
    pub fn to_index_map(&self, headers: &[String]) -> CategoryIndexMap {
        CategoryIndexMap::from_categorized_columns(&self.columns_by_category(), headers)
    }

    /// Header names per category, merged across repeated ids.
    pub fn columns_by_category(&self) -> BTreeMap<CategoryId, Vec<String>> {
        let mut columns: BTreeMap<CategoryId, Vec<String>> = BTreeMap::new();
        for entry in &self.categories {
            columns
                .entry(CategoryId::from(entry.id.as_str()))
                .or_default()
                .extend(entry.columns.iter().cloned());
        }
        columns
    }
}

fn entry_for(category: &CategoryId, map: &CategoryIndexMap, headers: &[String]) -> CategoryEntry {
    CategoryEntry {
        id: category.as_str().to_string(),
        name: category.display_name().to_string(),
        columns: map
            .indices(category)
            .iter()
            .filter_map(|&idx| headers.get(idx).cloned())
            .collect(),
    }
}
