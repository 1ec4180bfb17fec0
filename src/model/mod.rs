use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MergeError, Result};

/// A single spreadsheet cell after normalisation.
///
/// Null, numbers and text serialise as plain JSON values; dates serialise as
/// `{"date": "<iso>"}` so they survive a save and reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Empty cell.
    Null,
    /// Numeric literal.
    Number(f64),
    /// Plain text.
    Text(String),
    /// ISO-8601 text produced from a spreadsheet date cell.
    #[serde(with = "tagged_date")]
    Date(String),
}

impl CellValue {
    /// Returns true for [`CellValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Renders the cell as the text a user would see in the grid. Whole
    /// numbers print without a fractional part so `1.0` reads as `1`.
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Number(value) => format_number(*value),
            CellValue::Text(value) | CellValue::Date(value) => value.clone(),
        }
    }

    /// Collapses empty or whitespace-only text to [`CellValue::Null`].
    pub fn normalized(self) -> Self {
        match self {
            CellValue::Text(value) | CellValue::Date(value) if value.trim().is_empty() => {
                CellValue::Null
            }
            other => other,
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

mod tagged_date {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize)]
    struct DateRef<'a> {
        date: &'a str,
    }

    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct DateOwned {
        date: String,
    }

    pub fn serialize<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
        DateRef { date: value }.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        DateOwned::deserialize(deserializer).map(|wire| wire.date)
    }
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// One row keyed by header name.
pub type Record = BTreeMap<String, CellValue>;

/// Canonical tabular shape every engine component works on.
///
/// Every row carries exactly the keys in `headers`; missing cells are
/// [`CellValue::Null`] rather than absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Record>,
}

impl Dataset {
    /// Builds a dataset, rejecting duplicate headers and rows whose keys
    /// differ from the header list.
    pub fn new(headers: Vec<String>, rows: Vec<Record>) -> Result<Self> {
        let mut seen = HashSet::new();
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(MergeError::MalformedSheet(format!(
                    "duplicate header '{header}'"
                )));
            }
        }

        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != headers.len() || headers.iter().any(|h| !row.contains_key(h)) {
                return Err(MergeError::MalformedSheet(format!(
                    "row {row_idx} does not carry exactly the sheet headers"
                )));
            }
        }

        Ok(Self { headers, rows })
    }

    /// Number of columns in the sheet.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Position of `header`, if the sheet has it.
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    pub fn has_column(&self, header: &str) -> bool {
        self.column_index(header).is_some()
    }

    /// Resolves column indices to header names, failing on any index past the
    /// last column.
    pub fn headers_at(&self, indices: &[usize]) -> Result<Vec<String>> {
        select_headers(&self.headers, indices)
    }
}

/// Picks the headers at `indices`, failing on any index past the end.
pub fn select_headers(headers: &[String], indices: &[usize]) -> Result<Vec<String>> {
    indices
        .iter()
        .map(|&idx| {
            headers.get(idx).cloned().ok_or_else(|| {
                MergeError::InvalidCategoryMap(format!(
                    "column index {idx} is outside a sheet of {} columns",
                    headers.len()
                ))
            })
        })
        .collect()
}

/// Semantic grouping of gradebook columns.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CategoryId {
    Student,
    Quiz,
    Laboratory,
    Exams,
    Other,
    /// User-defined category.
    Custom(String),
}

impl CategoryId {
    /// The fixed categories every gradebook starts with, in display order.
    pub const BUILT_IN: [CategoryId; 5] = [
        CategoryId::Student,
        CategoryId::Quiz,
        CategoryId::Laboratory,
        CategoryId::Exams,
        CategoryId::Other,
    ];

    /// Stable identifier used when persisting the mapping.
    pub fn as_str(&self) -> &str {
        match self {
            CategoryId::Student => "student",
            CategoryId::Quiz => "quiz",
            CategoryId::Laboratory => "laboratory",
            CategoryId::Exams => "exams",
            CategoryId::Other => "other",
            CategoryId::Custom(id) => id,
        }
    }

    /// Human readable label shown in the grid header groups.
    pub fn display_name(&self) -> &str {
        match self {
            CategoryId::Student => "Student Info",
            CategoryId::Quiz => "Quiz",
            CategoryId::Laboratory => "Laboratory",
            CategoryId::Exams => "Exams",
            CategoryId::Other => "Other",
            CategoryId::Custom(id) => id,
        }
    }
}

impl From<&str> for CategoryId {
    fn from(value: &str) -> Self {
        match value {
            "student" => CategoryId::Student,
            "quiz" => CategoryId::Quiz,
            "laboratory" => CategoryId::Laboratory,
            "exams" => CategoryId::Exams,
            "other" => CategoryId::Other,
            custom => CategoryId::Custom(custom.to_string()),
        }
    }
}

impl From<String> for CategoryId {
    fn from(value: String) -> Self {
        CategoryId::from(value.as_str())
    }
}

impl From<CategoryId> for String {
    fn from(value: CategoryId) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_numbers_display_without_fraction() {
        assert_eq!(CellValue::Number(1.0).display_text(), "1");
        assert_eq!(CellValue::Number(87.5).display_text(), "87.5");
        assert_eq!(CellValue::Null.display_text(), "");
    }

    #[test]
    fn category_ids_round_trip_through_strings() {
        for category in CategoryId::BUILT_IN {
            assert_eq!(CategoryId::from(category.as_str()), category);
        }
        assert_eq!(
            CategoryId::from("participation"),
            CategoryId::Custom("participation".into())
        );
    }

    #[test]
    fn dates_keep_their_kind_through_json() {
        let cell = CellValue::Date("2024-01-01".into());
        let json = serde_json::to_value(&cell).expect("serialised");
        assert_eq!(json, serde_json::json!({ "date": "2024-01-01" }));
        let back: CellValue = serde_json::from_value(json).expect("deserialised");
        assert_eq!(back, cell);

        let text: CellValue = serde_json::from_value(serde_json::json!("2024-01-01"))
            .expect("deserialised");
        assert_eq!(text, CellValue::Text("2024-01-01".into()));
    }

    #[test]
    fn dataset_rejects_rows_missing_headers() {
        let mut row = Record::new();
        row.insert("Name".into(), CellValue::from("Ana"));
        let result = Dataset::new(vec!["Name".into(), "Quiz 1".into()], vec![row]);
        assert!(matches!(result, Err(MergeError::MalformedSheet(_))));
    }
}
