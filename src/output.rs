//! Output types: records, per-file outcomes, and batch statistics.

use crate::columns::{ColumnSpec, SCORE_LABEL, STUDENT_NAME_LABEL};
use crate::error::{ErrorKind, FileError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One extracted row.
///
/// `score` stays a string: sheets mix decimal commas, decimal points, and
/// letter grades, and interpreting them is left to the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub student_name: String,
    pub score: String,
    /// Custom column values keyed by their original display label.
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,
}

impl ExtractionRecord {
    /// Value for any display label, including the two mandatory ones.
    pub fn get(&self, label: &str) -> Option<&str> {
        match label {
            STUDENT_NAME_LABEL => Some(&self.student_name),
            SCORE_LABEL => Some(&self.score),
            other => self.custom_fields.get(other).map(String::as_str),
        }
    }

    /// Values in column order. Missing custom values come back empty.
    pub fn values<'a>(&'a self, columns: &'a ColumnSpec) -> impl Iterator<Item = &'a str> + 'a {
        columns.labels().map(move |label| self.get(label).unwrap_or(""))
    }
}

/// Result of processing one source image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Success {
        source_file_name: String,
        records: Vec<ExtractionRecord>,
    },
    Failure {
        source_file_name: String,
        error_kind: ErrorKind,
        message: String,
    },
}

impl FileOutcome {
    pub fn success(source_file_name: impl Into<String>, records: Vec<ExtractionRecord>) -> Self {
        FileOutcome::Success {
            source_file_name: source_file_name.into(),
            records,
        }
    }

    pub fn failure(source_file_name: impl Into<String>, error: &FileError) -> Self {
        FileOutcome::Failure {
            source_file_name: source_file_name.into(),
            error_kind: error.kind(),
            message: error.to_string(),
        }
    }

    /// Fold a per-file result into an outcome.
    pub fn from_result(
        source_file_name: impl Into<String>,
        result: Result<Vec<ExtractionRecord>, FileError>,
    ) -> Self {
        match result {
            Ok(records) => Self::success(source_file_name, records),
            Err(e) => Self::failure(source_file_name, &e),
        }
    }

    pub fn source_file_name(&self) -> &str {
        match self {
            FileOutcome::Success {
                source_file_name, ..
            }
            | FileOutcome::Failure {
                source_file_name, ..
            } => source_file_name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Success { .. })
    }

    /// Extracted records; empty for failures.
    pub fn records(&self) -> &[ExtractionRecord] {
        match self {
            FileOutcome::Success { records, .. } => records,
            FileOutcome::Failure { .. } => &[],
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            FileOutcome::Success { .. } => None,
            FileOutcome::Failure { error_kind, .. } => Some(*error_kind),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            FileOutcome::Success { .. } => None,
            FileOutcome::Failure { message, .. } => Some(message),
        }
    }
}

/// Aggregate statistics for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_files: usize,
    pub succeeded_files: usize,
    pub failed_files: usize,
    pub total_records: usize,
    pub duration_ms: u64,
}

impl BatchStats {
    pub fn from_outcomes(outcomes: &[FileOutcome], duration_ms: u64) -> Self {
        let succeeded_files = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            total_files: outcomes.len(),
            succeeded_files,
            failed_files: outcomes.len() - succeeded_files,
            total_records: outcomes.iter().map(|o| o.records().len()).sum(),
            duration_ms,
        }
    }
}

/// Everything a batch run produces, in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    pub outcomes: Vec<FileOutcome>,
    pub stats: BatchStats,
}
