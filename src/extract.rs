//! Batch extraction entry points.
//!
//! Files are processed strictly one after another: encode, call the model,
//! normalise, record a [`FileOutcome`], then move to the next file. A failed
//! file never stops the batch, and the outcome list always has one entry per
//! input in input order. Use [`Extractor::extract_stream`] to receive
//! outcomes as each file finishes.

use crate::columns::ColumnSpec;
use crate::config::ExtractionConfig;
use crate::error::{ExtractError, FileError};
use crate::output::{BatchOutput, BatchStats, ExtractionRecord, FileOutcome};
use crate::pipeline::encode::{encode_image, SourceImage};
use crate::pipeline::llm::{ExtractionClient, Transport};
use crate::pipeline::normalize;
use crate::pipeline::retry::Sleeper;
use crate::progress::{status_line, ProgressCallback};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Drives source images through encode → model → normalise.
pub struct Extractor {
    client: ExtractionClient,
    progress: Option<ProgressCallback>,
}

impl Extractor {
    /// Extractor backed by the real HTTP endpoint.
    pub fn new(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        Ok(Self {
            client: ExtractionClient::new(config)?,
            progress: config.progress_callback.clone(),
        })
    }

    /// Extractor with an injected transport and sleeper.
    pub fn with_transport(
        config: &ExtractionConfig,
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            client: ExtractionClient::with_transport(config, transport, sleeper),
            progress: config.progress_callback.clone(),
        }
    }

    /// Process every image in order.
    pub async fn extract_batch(&self, images: &[SourceImage], columns: &ColumnSpec) -> BatchOutput {
        self.extract_batch_with_cancel(images, columns, &CancellationToken::new())
            .await
    }

    /// Process every image in order, stopping early when `cancel` fires.
    ///
    /// Files not yet finished when the token is cancelled get a
    /// [`crate::ErrorKind::Cancelled`] failure, so the output still has one
    /// outcome per input.
    pub async fn extract_batch_with_cancel(
        &self,
        images: &[SourceImage],
        columns: &ColumnSpec,
        cancel: &CancellationToken,
    ) -> BatchOutput {
        let start = Instant::now();
        let total = images.len();
        info!("Starting extraction of {} files", total);

        if let Some(ref cb) = self.progress {
            cb.on_batch_start(total);
        }

        let mut outcomes = Vec::with_capacity(total);
        for (index, image) in images.iter().enumerate() {
            outcomes.push(self.extract_one(index, total, image, columns, cancel).await);
        }

        let stats = BatchStats::from_outcomes(&outcomes, start.elapsed().as_millis() as u64);
        info!(
            "Extraction complete: {}/{} files, {} records, {}ms",
            stats.succeeded_files, stats.total_files, stats.total_records, stats.duration_ms
        );

        if let Some(ref cb) = self.progress {
            cb.on_batch_complete(total, stats.succeeded_files);
        }

        BatchOutput { outcomes, stats }
    }

    /// Read and process image files by path.
    ///
    /// Unreadable files become [`crate::ErrorKind::Io`] failures.
    pub async fn extract_paths<P: AsRef<Path>>(
        &self,
        paths: &[P],
        columns: &ColumnSpec,
    ) -> BatchOutput {
        let images: Vec<SourceImage> = paths.iter().map(SourceImage::from_path).collect();
        self.extract_batch(&images, columns).await
    }

    /// Process a single file, reporting progress as file `index` of `total`.
    pub(crate) async fn extract_one(
        &self,
        index: usize,
        total: usize,
        image: &SourceImage,
        columns: &ColumnSpec,
        cancel: &CancellationToken,
    ) -> FileOutcome {
        let status = status_line(index, total, image.name());
        debug!("{}", status);
        if let Some(ref cb) = self.progress {
            cb.on_file_start(index, total, &status);
        }

        let outcome = if cancel.is_cancelled() {
            FileOutcome::failure(image.name(), &FileError::Cancelled)
        } else {
            FileOutcome::from_result(image.name(), self.run(image, columns, cancel).await)
        };

        match &outcome {
            FileOutcome::Success { records, .. } => {
                debug!("{}: {} records", image.name(), records.len());
                if let Some(ref cb) = self.progress {
                    cb.on_file_complete(index, total, records.len());
                }
            }
            FileOutcome::Failure {
                error_kind,
                message,
                ..
            } => {
                warn!("{}: {}: {}", image.name(), error_kind, message);
                if let Some(ref cb) = self.progress {
                    cb.on_file_error(index, total, message);
                }
            }
        }

        outcome
    }

    async fn run(
        &self,
        image: &SourceImage,
        columns: &ColumnSpec,
        cancel: &CancellationToken,
    ) -> Result<Vec<ExtractionRecord>, FileError> {
        let encoded = encode_image(image).await?;
        let raw = self
            .client
            .extract_raw(image.name(), &encoded, columns, cancel)
            .await?;
        normalize::normalize(&raw, columns)
    }
}

/// Extract records from image files using a configuration.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Returns `Err(ExtractError)` only when the HTTP client cannot be built.
/// Per-file problems are reported inside the returned [`BatchOutput`].
pub async fn extract<P: AsRef<Path>>(
    paths: &[P],
    columns: &ColumnSpec,
    config: &ExtractionConfig,
) -> Result<BatchOutput, ExtractError> {
    let extractor = Extractor::new(config)?;
    Ok(extractor.extract_paths(paths, columns).await)
}
