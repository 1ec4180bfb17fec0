//! Links incoming student rows to rows of an existing gradebook.
//!
//! Each existing row contributes a composite key (all identity values joined)
//! and one token per textual identity value. Numeric values such as roster
//! numbers only ever take part in the composite key. Matching tries the
//! composite key, then each token, then substring containment between tokens,
//! and the first tier that hits wins.
//! Within a tier the first row in sheet order is chosen, but every row that
//! hit is reported as a candidate so ambiguous links can be reviewed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::{CellValue, Dataset, Record, select_headers};

const KEY_SEPARATOR: &str = "|";

/// How an incoming row was linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    ExactComposite,
    ExactToken,
    Partial,
    Unmatched,
}

impl MatchType {
    /// Higher is more trustworthy; unmatched rows score zero.
    pub fn confidence(self) -> u8 {
        match self {
            MatchType::ExactComposite => 3,
            MatchType::ExactToken => 2,
            MatchType::Partial => 1,
            MatchType::Unmatched => 0,
        }
    }
}

/// Outcome of matching one incoming row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentMatch {
    pub new_row_index: usize,
    pub existing_row_index: Option<usize>,
    pub match_type: MatchType,
    /// Every existing row that hit at the winning tier, in sheet order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<usize>,
}

impl StudentMatch {
    pub fn unmatched(new_row_index: usize) -> Self {
        Self {
            new_row_index,
            existing_row_index: None,
            match_type: MatchType::Unmatched,
            candidates: Vec::new(),
        }
    }

    pub fn is_matched(&self) -> bool {
        self.existing_row_index.is_some()
    }

    /// True when more than one existing row could be this student.
    pub fn is_ambiguous(&self) -> bool {
        self.candidates.len() > 1
    }

    /// Partial and ambiguous links should be confirmed by a person.
    pub fn needs_review(&self) -> bool {
        self.match_type == MatchType::Partial || self.is_ambiguous()
    }
}

/// Identity values of one row, lower-cased and trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct IdentityKey {
    composite: String,
    /// Textual values longer than one character.
    tokens: Vec<String>,
}

impl IdentityKey {
    fn from_record(record: &Record, columns: &[String]) -> Self {
        let values: Vec<(String, bool)> = columns
            .iter()
            .map(|column| match record.get(column) {
                Some(cell) => {
                    let text = cell.display_text().trim().to_lowercase();
                    let numeric = matches!(cell, CellValue::Number(_)) || is_digits(&text);
                    (text, numeric)
                }
                None => (String::new(), false),
            })
            .collect();

        let composite = if values.iter().all(|(text, _)| text.is_empty()) {
            String::new()
        } else {
            values
                .iter()
                .map(|(text, _)| text.as_str())
                .collect::<Vec<_>>()
                .join(KEY_SEPARATOR)
        };
        let tokens = values
            .into_iter()
            .filter(|(text, numeric)| !numeric && text.chars().count() > 1)
            .map(|(text, _)| text)
            .collect();

        Self { composite, tokens }
    }
}

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|ch| ch.is_ascii_digit())
}

#[derive(Debug, Clone)]
struct IndexEntry {
    row: usize,
    key: IdentityKey,
}

/// Lookup of existing students by their identity columns.
#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
    composite: HashMap<String, Vec<usize>>,
    tokens: HashMap<String, Vec<usize>>,
    entries: Vec<IndexEntry>,
}

impl IdentityIndex {
    /// Indexes every row of `existing` by the values at `identity_columns`.
    pub fn build(existing: &Dataset, identity_columns: &[usize]) -> Result<Self> {
        let columns = existing.headers_at(identity_columns)?;
        Ok(Self::build_by_name(existing, &columns))
    }

    pub(crate) fn build_by_name(existing: &Dataset, columns: &[String]) -> Self {
        let mut index = Self::default();
        for (row, record) in existing.rows.iter().enumerate() {
            let key = IdentityKey::from_record(record, columns);
            if !key.composite.is_empty() {
                index
                    .composite
                    .entry(key.composite.clone())
                    .or_default()
                    .push(row);
            }
            for token in &key.tokens {
                let rows = index.tokens.entry(token.clone()).or_default();
                if rows.last() != Some(&row) {
                    rows.push(row);
                }
            }
            index.entries.push(IndexEntry { row, key });
        }
        debug!(
            rows = index.entries.len(),
            composite_keys = index.composite.len(),
            tokens = index.tokens.len(),
            "built identity index"
        );
        index
    }

    /// Matches one incoming row whose identity values sit at
    /// `identity_columns` of `headers`.
    pub fn match_row(
        &self,
        new_row_index: usize,
        row: &Record,
        headers: &[String],
        identity_columns: &[usize],
    ) -> Result<StudentMatch> {
        let columns = select_headers(headers, identity_columns)?;
        Ok(self.match_by_name(new_row_index, row, &columns))
    }

    /// Matches every row of `incoming`, in row order.
    pub fn match_all(
        &self,
        incoming: &Dataset,
        identity_columns: &[usize],
    ) -> Result<Vec<StudentMatch>> {
        let columns = incoming.headers_at(identity_columns)?;
        Ok(self.match_all_by_name(incoming, &columns))
    }

    pub(crate) fn match_all_by_name(
        &self,
        incoming: &Dataset,
        columns: &[String],
    ) -> Vec<StudentMatch> {
        incoming
            .rows
            .iter()
            .enumerate()
            .map(|(row, record)| self.match_by_name(row, record, columns))
            .collect()
    }

    fn match_by_name(&self, new_row_index: usize, row: &Record, columns: &[String]) -> StudentMatch {
        let key = IdentityKey::from_record(row, columns);

        let found = self
            .exact_composite(&key)
            .map(|rows| (MatchType::ExactComposite, rows))
            .or_else(|| self.exact_token(&key).map(|rows| (MatchType::ExactToken, rows)))
            .or_else(|| self.partial(&key).map(|rows| (MatchType::Partial, rows)));

        let Some((match_type, candidates)) = found else {
            return StudentMatch::unmatched(new_row_index);
        };

        if candidates.len() > 1 {
            warn!(
                new_row = new_row_index,
                ?match_type,
                ?candidates,
                "incoming row matches several existing students"
            );
        }

        StudentMatch {
            new_row_index,
            existing_row_index: candidates.first().copied(),
            match_type,
            candidates,
        }
    }

    fn exact_composite(&self, key: &IdentityKey) -> Option<Vec<usize>> {
        if key.composite.is_empty() {
            return None;
        }
        self.composite.get(&key.composite).cloned()
    }

    fn exact_token(&self, key: &IdentityKey) -> Option<Vec<usize>> {
        key.tokens
            .iter()
            .find_map(|token| self.tokens.get(token))
            .cloned()
    }

    fn partial(&self, key: &IdentityKey) -> Option<Vec<usize>> {
        let rows: Vec<usize> = self
            .entries
            .iter()
            .filter(|entry| {
                key.tokens
                    .iter()
                    .any(|token| entry.key.tokens.iter().any(|stored| overlaps(token, stored)))
            })
            .map(|entry| entry.row)
            .collect();
        (!rows.is_empty()).then_some(rows)
    }
}

fn overlaps(lhs: &str, rhs: &str) -> bool {
    !lhs.is_empty() && !rhs.is_empty() && (lhs.contains(rhs) || rhs.contains(lhs))
}
