//! CSV and JSON export of batch outcomes.
//!
//! CSV has one row per extracted record, prefixed with the source file name.
//! Failed files get a single row carrying the error so they are visible in
//! the spreadsheet rather than silently missing. Fields are quoted per
//! RFC 4180. JSON is the serialised outcome list.
//!
//! Both file writers go through a temp file and a rename, so a reader never
//! sees a half-written export.

use crate::columns::ColumnSpec;
use crate::error::ExtractError;
use crate::output::FileOutcome;
use std::borrow::Cow;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

const BOM: &str = "\u{FEFF}";

/// CSV rendering options.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Prefix a UTF-8 byte-order mark so spreadsheet apps detect the encoding
    /// of non-ASCII names. Default: true.
    pub byte_order_mark: bool,
    /// Emit a row for each failed file. Default: true.
    pub include_failures: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            byte_order_mark: true,
            include_failures: true,
        }
    }
}

/// Render outcomes as CSV text.
pub fn to_csv(outcomes: &[FileOutcome], columns: &ColumnSpec, options: &CsvOptions) -> String {
    let mut out = String::new();
    if options.byte_order_mark {
        out.push_str(BOM);
    }

    let header = std::iter::once("File Name")
        .chain(columns.labels())
        .chain(["Status", "Error"]);
    push_row(&mut out, header);

    for outcome in outcomes {
        match outcome {
            FileOutcome::Success {
                source_file_name,
                records,
            } => {
                for record in records {
                    let row = std::iter::once(source_file_name.as_str())
                        .chain(record.values(columns))
                        .chain(["success", ""]);
                    push_row(&mut out, row);
                }
            }
            FileOutcome::Failure {
                source_file_name,
                message,
                ..
            } if options.include_failures => {
                let blanks = columns.labels().map(|_| "");
                let row = std::iter::once(source_file_name.as_str())
                    .chain(blanks)
                    .chain(["error", message.as_str()]);
                push_row(&mut out, row);
            }
            FileOutcome::Failure { .. } => {}
        }
    }

    out
}

/// Write CSV to `path` atomically (temp file + rename).
pub async fn write_csv_file(
    path: impl AsRef<Path>,
    outcomes: &[FileOutcome],
    columns: &ColumnSpec,
    options: &CsvOptions,
) -> Result<(), ExtractError> {
    let csv = to_csv(outcomes, columns, options);
    write_atomic(path.as_ref(), csv.as_bytes()).await
}

/// Render outcomes as pretty-printed JSON, newline-terminated.
pub fn to_json(outcomes: &[FileOutcome]) -> Result<String, ExtractError> {
    let mut json = serde_json::to_string_pretty(outcomes)
        .map_err(|e| ExtractError::Internal(format!("Failed to serialise outcomes: {e}")))?;
    json.push('\n');
    Ok(json)
}

/// Write JSON outcomes to `path` atomically (temp file + rename).
pub async fn write_json_file(
    path: impl AsRef<Path>,
    outcomes: &[FileOutcome],
) -> Result<(), ExtractError> {
    let json = to_json(outcomes)?;
    write_atomic(path.as_ref(), json.as_bytes()).await
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ExtractError> {
    let write_err = |e| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = tmp_path(path);
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    Ok(())
}

/// `scores.csv` → `scores.csv.tmp`, next to the target so rename stays on
/// one filesystem.
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn push_row<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    let line = fields
        .into_iter()
        .map(escape_field)
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push_str("\r\n");
}

fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
