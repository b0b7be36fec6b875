//! Error types for the scoresheet-extract library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`] — **Fatal**: the batch cannot start at all (missing
//!   API key, malformed endpoint, invalid column list). Returned as
//!   `Err(ExtractError)` before any file is touched.
//!
//! * [`FileError`] — **Non-fatal**: a single image failed (unreadable file,
//!   exhausted retries, malformed model output) while the rest of the batch
//!   carries on. Stored inside [`crate::output::FileOutcome::Failure`] as an
//!   [`ErrorKind`] plus message.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the scoresheet-extract library.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Credential or endpoint is missing or unusable. Blocks the whole run.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested column labels cannot be turned into a schema.
    #[error("Invalid column list: {0}")]
    InvalidColumns(String),

    /// Could not create or write an export file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Classification of a per-file failure.
///
/// Downstream consumers (results table, CSV export, tests) branch on this
/// rather than on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The source image could not be read.
    Io,
    /// HTTP 429 / 5xx on every attempt.
    TransientRequest,
    /// Non-retryable HTTP status, or the transport itself failed.
    FatalRequest,
    /// The call succeeded but the model returned no usable text.
    Content,
    /// The payload is not a JSON array, or a record lacks a mandatory field.
    SchemaViolation,
    /// The batch was cancelled before this file finished.
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Io => "io_error",
            ErrorKind::TransientRequest => "transient_request_error",
            ErrorKind::FatalRequest => "fatal_request_error",
            ErrorKind::Content => "content_error",
            ErrorKind::SchemaViolation => "schema_violation",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal error for a single source image.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FileError {
    /// Reading the image bytes failed.
    #[error("Could not read '{name}': {detail}")]
    Io { name: String, detail: String },

    /// Every attempt hit a rate limit or server error.
    #[error("Request failed after {attempts} attempts (HTTP {status}): {message}")]
    TransientRequest {
        attempts: u32,
        status: u16,
        message: String,
    },

    /// The endpoint answered with a non-retryable status.
    #[error("Request rejected (HTTP {status}): {message}")]
    FatalStatus { status: u16, message: String },

    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Success status but no text payload.
    #[error("Model returned no content: {detail}")]
    Content { detail: String },

    /// Payload is not the expected array of records.
    #[error("Schema violation: {detail}")]
    SchemaViolation { detail: String },

    #[error("Cancelled before completion")]
    Cancelled,
}

impl FileError {
    /// The coarse kind surfaced in [`crate::output::FileOutcome::Failure`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            FileError::Io { .. } => ErrorKind::Io,
            FileError::TransientRequest { .. } => ErrorKind::TransientRequest,
            FileError::FatalStatus { .. } | FileError::Transport { .. } => ErrorKind::FatalRequest,
            FileError::Content { .. } => ErrorKind::Content,
            FileError::SchemaViolation { .. } => ErrorKind::SchemaViolation,
            FileError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub(crate) fn schema(detail: impl Into<String>) -> Self {
        FileError::SchemaViolation {
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_display_keeps_status_and_attempts() {
        let e = FileError::TransientRequest {
            attempts: 3,
            status: 503,
            message: "overloaded".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("3 attempts"), "got: {msg}");
        assert!(msg.contains("503"), "got: {msg}");
        assert!(msg.contains("overloaded"), "got: {msg}");
    }

    #[test]
    fn transport_and_fatal_status_share_kind() {
        let transport = FileError::Transport {
            message: "dns failure".into(),
        };
        let status = FileError::FatalStatus {
            status: 403,
            message: "forbidden".into(),
        };
        assert_eq!(transport.kind(), ErrorKind::FatalRequest);
        assert_eq!(status.kind(), ErrorKind::FatalRequest);
    }

    #[test]
    fn kind_serialises_snake_case() {
        let json = serde_json::to_string(&ErrorKind::SchemaViolation).unwrap();
        assert_eq!(json, "\"schema_violation\"");
        assert_eq!(ErrorKind::TransientRequest.to_string(), "transient_request_error");
    }

    #[test]
    fn configuration_display() {
        let e = ExtractError::Configuration("GEMINI_API_KEY is not set".into());
        assert!(e.to_string().contains("GEMINI_API_KEY"));
    }
}
