//! Keyword heuristics mapping column headers to categories.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::CategoryId;

/// Keyword lists driving [`ColumnClassifier`]. Every list is matched against
/// the lower-cased header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClassifierRules {
    /// Substrings marking an identity column.
    pub identity_substrings: Vec<String>,
    /// Short identity keywords that must appear as a whole word.
    pub identity_words: Vec<String>,
    pub quiz_keywords: Vec<String>,
    /// Keyword pairs that must both appear for a quiz column.
    pub quiz_pairs: Vec<(String, String)>,
    pub laboratory_keywords: Vec<String>,
    pub laboratory_pairs: Vec<(String, String)>,
    pub exam_keywords: Vec<String>,
    /// Headers equal to one of these codes are exams.
    pub exam_codes: Vec<String>,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            identity_substrings: strings(&[
                "name", "student", "no.", "first", "last", "middle", "learner",
            ]),
            identity_words: strings(&["id", "no"]),
            quiz_keywords: strings(&["quiz", "test"]),
            quiz_pairs: vec![("html".into(), "basic".into())],
            laboratory_keywords: strings(&[
                "lab",
                "laboratory",
                "activity",
                "exercise",
                "homework",
            ]),
            laboratory_pairs: vec![("html".into(), "advanc".into())],
            exam_keywords: strings(&["exam", "prelim", "midterm", "final"]),
            exam_codes: strings(&["pe", "me", "fe", "pfe"]),
        }
    }
}

impl ClassifierRules {
    /// Loads rules from a JSON file; omitted lists keep their defaults.
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

/// Fallback classifier for headers that have no persisted category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnClassifier {
    rules: ClassifierRules,
}

impl ColumnClassifier {
    pub fn new(rules: ClassifierRules) -> Self {
        Self { rules }
    }

    /// Classifies a header by keyword. Identity is checked first and wins over
    /// every other category.
    pub fn classify(&self, header: &str) -> CategoryId {
        let lowered = header.trim().to_lowercase();
        let rules = &self.rules;

        if is_identity(&lowered, rules) {
            return CategoryId::Student;
        }
        if contains_any(&lowered, &rules.quiz_keywords)
            || contains_pair(&lowered, &rules.quiz_pairs)
        {
            return CategoryId::Quiz;
        }
        if contains_any(&lowered, &rules.laboratory_keywords)
            || contains_pair(&lowered, &rules.laboratory_pairs)
        {
            return CategoryId::Laboratory;
        }
        if contains_any(&lowered, &rules.exam_keywords)
            || rules.exam_codes.iter().any(|code| lowered == *code)
        {
            return CategoryId::Exams;
        }
        CategoryId::Other
    }

    /// Returns the persisted category for `header` when one exists, otherwise
    /// the heuristic classification.
    pub fn classify_known(
        &self,
        header: &str,
        known: &BTreeMap<String, CategoryId>,
    ) -> CategoryId {
        known
            .get(header)
            .cloned()
            .unwrap_or_else(|| self.classify(header))
    }
}

/// Classifies `header` with the default rules.
pub fn classify(header: &str) -> CategoryId {
    ColumnClassifier::default().classify(header)
}

fn is_identity(lowered: &str, rules: &ClassifierRules) -> bool {
    if contains_any(lowered, &rules.identity_substrings) {
        return true;
    }
    lowered
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .any(|word| rules.identity_words.iter().any(|keyword| keyword == word))
}

fn contains_any(lowered: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|keyword| lowered.contains(keyword.as_str()))
}

fn contains_pair(lowered: &str, pairs: &[(String, String)]) -> bool {
    pairs
        .iter()
        .any(|(lhs, rhs)| lowered.contains(lhs.as_str()) && lowered.contains(rhs.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_identity_keywords_need_word_boundaries() {
        assert_eq!(classify("Midterm"), CategoryId::Exams);
        assert_eq!(classify("Student ID"), CategoryId::Student);
        assert_eq!(classify("ID"), CategoryId::Student);
        assert_eq!(classify("No"), CategoryId::Student);
        assert_eq!(classify("Notes"), CategoryId::Other);
    }

    #[test]
    fn headers_follow_category_precedence() {
        let cases = [
            ("Student Quiz", CategoryId::Student),
            ("Last Name", CategoryId::Student),
            ("Lab Test", CategoryId::Quiz),
            ("Midterm Quiz", CategoryId::Quiz),
            ("HTML Basics", CategoryId::Quiz),
            ("HTML Advanced", CategoryId::Laboratory),
            ("Lab Exam", CategoryId::Laboratory),
            ("Homework 2", CategoryId::Laboratory),
            ("Final Exam", CategoryId::Exams),
            ("PE", CategoryId::Exams),
            ("me", CategoryId::Exams),
            (" FE ", CategoryId::Exams),
            ("PFE", CategoryId::Exams),
            ("Pep", CategoryId::Other),
            ("Remarks", CategoryId::Other),
        ];
        for (header, expected) in cases {
            assert_eq!(classify(header), expected, "header {header:?}");
        }
    }

    #[test]
    fn persisted_assignment_wins_over_keywords() {
        let known = BTreeMap::from([("Quiz 1".to_string(), CategoryId::Other)]);
        let classifier = ColumnClassifier::default();
        assert_eq!(classifier.classify_known("Quiz 1", &known), CategoryId::Other);
        assert_eq!(classifier.classify_known("Quiz 2", &known), CategoryId::Quiz);
    }

    #[test]
    fn partial_rules_fall_back_to_defaults() {
        let rules: ClassifierRules =
            serde_json::from_str(r#"{ "quizKeywords": ["quiz", "seatwork"] }"#)
                .expect("rules parsed");
        let classifier = ColumnClassifier::new(rules);
        assert_eq!(classifier.classify("Seatwork 1"), CategoryId::Quiz);
        assert_eq!(classifier.classify("Lab 1"), CategoryId::Laboratory);
    }
}
