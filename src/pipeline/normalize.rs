//! Result normalisation: model text → validated [`ExtractionRecord`]s.
//!
//! Two steps, both all-or-nothing per file:
//!
//! 1. [`parse_payload`] strips wrapper noise (code fences, BOM) and requires
//!    the payload to be a JSON array.
//! 2. [`normalize`] requires every element to carry the mandatory name and
//!    score fields and maps custom keys back to their display labels through
//!    the [`ColumnSpec`] table.
//!
//! One malformed record discards the whole file's batch.

use crate::columns::{ColumnSpec, SCORE_KEY, STUDENT_NAME_KEY};
use crate::error::FileError;
use crate::output::ExtractionRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

static OUTER_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[a-zA-Z]*[ \t]*\r?\n(.*?)\r?\n?```\s*$").expect("valid regex")
});

/// Parse model text into a JSON array.
///
/// # Errors
/// [`FileError::SchemaViolation`] if the text is not JSON or not an array.
pub fn parse_payload(text: &str) -> Result<Vec<Value>, FileError> {
    let cleaned = strip_wrappers(text);
    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| FileError::schema(format!("payload is not valid JSON: {e}")))?;

    match value {
        Value::Array(items) => Ok(items),
        other => Err(FileError::schema(format!(
            "expected a JSON array, got {}",
            json_type_name(&other)
        ))),
    }
}

/// Map raw array elements to records.
///
/// An empty array is a success with zero records.
///
/// # Errors
/// [`FileError::SchemaViolation`] if any element is not an object or lacks a
/// string-coercible `student_name` or `score`.
pub fn normalize(raw: &[Value], columns: &ColumnSpec) -> Result<Vec<ExtractionRecord>, FileError> {
    raw.iter()
        .enumerate()
        .map(|(i, element)| normalize_one(i, element, columns))
        .collect()
}

fn normalize_one(
    index: usize,
    element: &Value,
    columns: &ColumnSpec,
) -> Result<ExtractionRecord, FileError> {
    let object = element.as_object().ok_or_else(|| {
        FileError::schema(format!(
            "record {}: expected an object, got {}",
            index + 1,
            json_type_name(element)
        ))
    })?;

    let mandatory = |key: &str| -> Result<String, FileError> {
        match object.get(key) {
            None => Err(FileError::schema(format!(
                "record {}: missing '{key}'",
                index + 1
            ))),
            Some(v) => coerce_string(v).ok_or_else(|| {
                FileError::schema(format!(
                    "record {}: '{key}' is {}, not a string",
                    index + 1,
                    json_type_name(v)
                ))
            }),
        }
    };

    let student_name = mandatory(STUDENT_NAME_KEY)?;
    let score = mandatory(SCORE_KEY)?;

    let custom_fields: BTreeMap<String, String> = columns
        .custom_columns()
        .iter()
        .map(|column| {
            let value = match object.get(&column.key) {
                None | Some(Value::Null) => String::new(),
                Some(v) => coerce_string(v).unwrap_or_else(|| v.to_string()),
            };
            (column.label.clone(), value)
        })
        .collect();

    Ok(ExtractionRecord {
        student_name,
        score,
        custom_fields,
    })
}

/// Strings pass through; numbers and booleans keep their JSON spelling.
fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Remove a leading BOM and an outer ```` ```json ```` fence.
fn strip_wrappers(text: &str) -> &str {
    let text = text.trim_start_matches('\u{FEFF}').trim();
    match OUTER_FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => text,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
