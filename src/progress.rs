//! Progress-callback trait for per-file extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through a batch. Files are processed one at
//! a time, so events for a batch always arrive in input order.
//!
//! # Example
//!
//! ```rust
//! use scoresheet_extract::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::Arc;
//!
//! struct PrintStatus;
//!
//! impl ExtractionProgressCallback for PrintStatus {
//!     fn on_file_start(&self, _index: usize, _total: usize, status: &str) {
//!         eprintln!("{status}");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .api_key("test-key")
//!     .progress_callback(Arc::new(PrintStatus))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the extraction pipeline as it processes each file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is 0-based.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before the first file.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before a file is encoded and sent.
    ///
    /// `status` is a human-readable line such as `Processing 2/5: sheet.png`.
    fn on_file_start(&self, index: usize, total_files: usize, status: &str) {
        let _ = (index, total_files, status);
    }

    /// Called when a file produced records (possibly zero).
    fn on_file_complete(&self, index: usize, total_files: usize, record_count: usize) {
        let _ = (index, total_files, record_count);
    }

    /// Called when a file failed.
    fn on_file_error(&self, index: usize, total_files: usize, error: &str) {
        let _ = (index, total_files, error);
    }

    /// Called once after every file has an outcome.
    fn on_batch_complete(&self, total_files: usize, succeeded_files: usize) {
        let _ = (total_files, succeeded_files);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

/// Status line shown before a file starts.
pub fn status_line(index: usize, total_files: usize, file_name: &str) -> String {
    format!("Processing {}/{}: {}", index + 1, total_files, file_name)
}
