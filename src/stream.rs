//! Streaming extraction API: emit outcomes as files complete.
//!
//! Unlike [`Extractor::extract_batch`], which returns only after the last
//! file, [`Extractor::extract_stream`] yields each [`FileOutcome`] as soon as
//! its file is done. Files are still processed one at a time, so outcomes
//! arrive in input order.

use crate::columns::ColumnSpec;
use crate::extract::Extractor;
use crate::output::FileOutcome;
use crate::pipeline::encode::SourceImage;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

/// A boxed stream of per-file outcomes.
pub type OutcomeStream<'a> = Pin<Box<dyn Stream<Item = FileOutcome> + Send + 'a>>;

impl Extractor {
    /// Process `images` lazily, one per poll of the returned stream.
    ///
    /// Dropping the stream stops processing after the file in flight.
    ///
    /// # Example
    /// ```rust,no_run
    /// use futures::StreamExt;
    /// use scoresheet_extract::{ColumnSpec, ExtractionConfig, Extractor, SourceImage};
    /// use tokio_util::sync::CancellationToken;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = ExtractionConfig::from_env()?;
    /// let extractor = Extractor::new(&config)?;
    /// let columns = ColumnSpec::new(["Class"])?;
    /// let images = vec![SourceImage::from_path("sheet1.jpg")];
    ///
    /// let mut outcomes = extractor.extract_stream(images, &columns, CancellationToken::new());
    /// while let Some(outcome) = outcomes.next().await {
    ///     println!("{}: {} records", outcome.source_file_name(), outcome.records().len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn extract_stream<'a>(
        &'a self,
        images: Vec<SourceImage>,
        columns: &'a ColumnSpec,
        cancel: CancellationToken,
    ) -> OutcomeStream<'a> {
        let total = images.len();
        let s = stream::iter(images.into_iter().enumerate()).then(move |(index, image)| {
            let cancel = cancel.clone();
            async move {
                self.extract_one(index, total, &image, columns, &cancel)
                    .await
            }
        });
        Box::pin(s)
    }
}
