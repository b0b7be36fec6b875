//! Column specification and the label↔key table.
//!
//! Every extraction asks for two mandatory fields (student name and score)
//! plus any number of caller-supplied custom labels such as "Student ID" or
//! "Class". The model only sees machine-safe keys (`student_id`, `class`), so
//! the mapping from key back to label must survive the round trip.
//!
//! Keys are derived once, when the [`ColumnSpec`] is built, and stored next
//! to their labels. Reading a response looks the key up in that table; it
//! never re-applies the derivation, because two labels such as "Class A" and
//! "Class-A" derive the same key. Colliding keys get a numeric suffix.

use crate::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Response key of the mandatory name field.
pub const STUDENT_NAME_KEY: &str = "student_name";
/// Response key of the mandatory score field.
pub const SCORE_KEY: &str = "score";
/// Display label of the mandatory name field.
pub const STUDENT_NAME_LABEL: &str = "Student Name";
/// Display label of the mandatory score field.
pub const SCORE_LABEL: &str = "Score";

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// One caller-supplied column with its derived response key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomColumn {
    pub label: String,
    pub key: String,
}

/// Ordered, deduplicated set of columns to extract.
///
/// The mandatory name and score columns are always present and always come
/// first; [`ColumnSpec::custom_columns`] holds only the extras, in the order
/// the caller gave them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    custom: Vec<CustomColumn>,
}

impl ColumnSpec {
    /// Spec with only the mandatory name and score columns.
    pub fn mandatory_only() -> Self {
        Self::default()
    }

    /// Build a spec from custom labels.
    ///
    /// Labels are trimmed. Labels naming a mandatory field are dropped, as
    /// are repeats of an earlier custom label. Both comparisons ignore case
    /// and collapse inner whitespace, so `"Student  ID"` repeats
    /// `"student id"`; the first spelling is the one kept.
    ///
    /// # Errors
    /// [`ExtractError::InvalidColumns`] if a label is empty after trimming.
    pub fn new<I, S>(labels: I) -> Result<Self, ExtractError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen_labels: HashSet<String> = HashSet::new();
        let mut taken_keys: HashSet<String> =
            [STUDENT_NAME_KEY.to_string(), SCORE_KEY.to_string()].into();
        let mut custom = Vec::new();

        for raw in labels {
            let label = raw.as_ref().trim();
            if label.is_empty() {
                return Err(ExtractError::InvalidColumns(
                    "column labels must not be empty".into(),
                ));
            }
            if is_mandatory_label(label) || !seen_labels.insert(comparable(label)) {
                continue;
            }

            let base = derive_key(label);
            let mut key = base.clone();
            let mut suffix = 2;
            while taken_keys.contains(&key) {
                key = format!("{base}_{suffix}");
                suffix += 1;
            }
            taken_keys.insert(key.clone());

            custom.push(CustomColumn {
                label: label.to_string(),
                key,
            });
        }

        Ok(Self { custom })
    }

    /// The caller-supplied columns, in order.
    pub fn custom_columns(&self) -> &[CustomColumn] {
        &self.custom
    }

    /// Every display label, mandatory first, then custom in order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        [STUDENT_NAME_LABEL, SCORE_LABEL]
            .into_iter()
            .chain(self.custom.iter().map(|c| c.label.as_str()))
    }

    /// Every response key, in the same order as [`ColumnSpec::labels`].
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        [STUDENT_NAME_KEY, SCORE_KEY]
            .into_iter()
            .chain(self.custom.iter().map(|c| c.key.as_str()))
    }

    /// Display label for a custom response key.
    pub fn label_for_key(&self, key: &str) -> Option<&str> {
        self.custom
            .iter()
            .find(|c| c.key == key)
            .map(|c| c.label.as_str())
    }

    /// Response key for a custom display label.
    pub fn key_for_label(&self, label: &str) -> Option<&str> {
        self.custom
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.key.as_str())
    }
}

/// Derive a machine-safe key from a display label.
///
/// Folds diacritics (`"Mã học sinh"` → `ma_hoc_sinh`), lowercases, treats
/// every run of non-alphanumeric characters as a word break, and joins the
/// words with `_`. Labels with no ASCII alphanumerics left after folding
/// fall back to `field`.
pub fn derive_key(label: &str) -> String {
    let lowered = fold_diacritics(label).to_lowercase();
    let key = NON_ALNUM
        .split(&lowered)
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    if key.is_empty() {
        "field".to_string()
    } else {
        key
    }
}

/// Strip combining marks after canonical decomposition. `đ` has no
/// decomposition and is mapped by hand.
fn fold_diacritics(label: &str) -> String {
    label
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'đ' => 'd',
            'Đ' => 'D',
            other => other,
        })
        .collect()
}

/// Case-insensitive form with whitespace runs collapsed, for label equality.
fn comparable(label: &str) -> String {
    WHITESPACE.replace_all(label.trim(), " ").to_lowercase()
}

fn is_mandatory_label(label: &str) -> bool {
    let normalised = comparable(label);
    normalised == STUDENT_NAME_LABEL.to_lowercase() || normalised == SCORE_LABEL.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_joins_words() {
        assert_eq!(derive_key("Student ID"), "student_id");
        assert_eq!(derive_key("  Class  "), "class");
        assert_eq!(derive_key("Date of birth (dd/mm)"), "date_of_birth_dd_mm");
    }

    #[test]
    fn derive_key_without_ascii_falls_back() {
        assert_eq!(derive_key("Лист"), "field");
    }

    #[test]
    fn derive_key_folds_vietnamese_diacritics() {
        assert_eq!(derive_key("Lớp"), "lop");
        assert_eq!(derive_key("Lập"), "lap");
        assert_eq!(derive_key("Mã học sinh"), "ma_hoc_sinh");
        assert_eq!(derive_key("Điểm TB"), "diem_tb");
        assert_eq!(derive_key("Tên học sinh"), "ten_hoc_sinh");
    }

    #[test]
    fn distinct_vietnamese_labels_keep_distinct_keys() {
        let spec = ColumnSpec::new(["Lớp", "Lập"]).unwrap();
        let keys: Vec<_> = spec.keys().collect();
        assert_eq!(keys, vec!["student_name", "score", "lop", "lap"]);
        assert_eq!(spec.label_for_key("lop"), Some("Lớp"));
    }

    #[test]
    fn duplicates_ignore_case_and_spacing() {
        let spec = ColumnSpec::new(["Student  ID", "Student ID", "Class", "class"]).unwrap();
        let labels: Vec<_> = spec.custom_columns().iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Student  ID", "Class"]);
        let keys: Vec<_> = spec.custom_columns().iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["student_id", "class"]);
    }

    #[test]
    fn mandatory_labels_are_dropped() {
        let spec = ColumnSpec::new(["student  NAME", " Score ", "Class"]).unwrap();
        let labels: Vec<_> = spec.labels().collect();
        assert_eq!(labels, vec!["Student Name", "Score", "Class"]);
    }

    #[test]
    fn duplicate_custom_labels_are_dropped() {
        let spec = ColumnSpec::new(["Class", "Class ", "Student ID"]).unwrap();
        assert_eq!(spec.custom_columns().len(), 2);
        assert_eq!(spec.custom_columns()[1].label, "Student ID");
    }

    #[test]
    fn colliding_keys_get_suffix() {
        let spec = ColumnSpec::new(["Class A", "Class-A", "class_a"]).unwrap();
        let keys: Vec<_> = spec.custom_columns().iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["class_a", "class_a_2", "class_a_3"]);
        assert_eq!(spec.label_for_key("class_a_2"), Some("Class-A"));
        assert_eq!(spec.key_for_label("class_a"), Some("class_a_3"));
    }

    #[test]
    fn custom_key_cannot_shadow_mandatory_key() {
        let spec = ColumnSpec::new(["Score!"]).unwrap();
        // "Score!" is not a mandatory label, but derives the mandatory key.
        assert_eq!(spec.custom_columns()[0].key, "score_2");
    }

    #[test]
    fn empty_label_is_rejected() {
        let err = ColumnSpec::new(["Class", "   "]).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidColumns(_)));
    }

    #[test]
    fn keys_follow_label_order() {
        let spec = ColumnSpec::new(["Student ID", "Class"]).unwrap();
        let keys: Vec<_> = spec.keys().collect();
        assert_eq!(keys, vec!["student_name", "score", "student_id", "class"]);
    }
}
