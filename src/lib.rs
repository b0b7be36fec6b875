//! # scoresheet-extract
//!
//! Extract student names and scores from photos of test papers and score
//! lists using a multimodal model, and export them as CSV or JSON.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image file
//!  │
//!  ├─ 1. Encode     read once, base64 + MIME type
//!  ├─ 2. Request    instructions + array-of-objects response schema
//!  ├─ 3. Model      generateContent with 429/5xx retry (1 s, 2 s, …)
//!  ├─ 4. Normalise  validate the array, map keys back to column labels
//!  └─ 5. Outcome    Success { records } | Failure { kind, message }
//! ```
//!
//! Files are processed one at a time. A failure in one file never stops the
//! batch, and the outcome list always matches the input order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scoresheet_extract::{extract, ColumnSpec, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GEMINI_API_KEY (and optionally GEMINI_ENDPOINT / GEMINI_MODEL)
//!     let config = ExtractionConfig::from_env()?;
//!     let columns = ColumnSpec::new(["Student ID", "Class"])?;
//!     let output = extract(&["sheet1.jpg", "sheet2.png"], &columns, &config).await?;
//!     for outcome in &output.outcomes {
//!         for record in outcome.records() {
//!             println!("{}: {}", record.student_name, record.score);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scoresheet` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod columns;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use columns::{ColumnSpec, CustomColumn};
pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::{ErrorKind, ExtractError, FileError};
pub use export::{to_csv, to_json, write_csv_file, write_json_file, CsvOptions};
pub use extract::{extract, Extractor};
pub use output::{BatchOutput, BatchStats, ExtractionRecord, FileOutcome};
pub use pipeline::encode::{encode_image, EncodedImage, SourceImage};
pub use pipeline::llm::{ExtractionClient, HttpTransport, Transport, TransportError, TransportResponse};
pub use pipeline::retry::{AttemptClass, RetryPolicy, RetryState, Sleeper, TokioSleeper};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::OutcomeStream;
