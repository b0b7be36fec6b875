//! Image encoding: source bytes → base64 [`EncodedImage`].
//!
//! The model endpoint accepts images inline in the JSON request body as a
//! base64 string plus MIME type. The bytes are passed through untouched;
//! re-encoding a phone photo would only cost time and detail.

use crate::error::FileError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where the image bytes come from.
#[derive(Debug, Clone)]
enum ImageBytes {
    Memory(Vec<u8>),
    File(PathBuf),
}

/// An image supplied by the caller, read once when encoded.
#[derive(Debug, Clone)]
pub struct SourceImage {
    name: String,
    mime_type: Option<String>,
    bytes: ImageBytes,
}

impl SourceImage {
    /// An image already held in memory.
    ///
    /// When `mime_type` is `None` it is sniffed from the bytes at encode time.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: Option<&str>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.map(str::to_string),
            bytes: ImageBytes::Memory(bytes.into()),
        }
    }

    /// An image on disk. The file is not opened until [`encode_image`].
    ///
    /// The display name is the file name; the MIME type is guessed from the
    /// extension and, failing that, from the bytes.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = ImageFormat::from_path(path)
            .ok()
            .map(|f| f.to_mime_type().to_string());
        Self {
            name,
            mime_type,
            bytes: ImageBytes::File(path.to_path_buf()),
        }
    }

    /// Display name used in outcomes and status lines.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared MIME type, if known before reading.
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }
}

/// Base64 image data ready for an inline request part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub base64_data: String,
    pub mime_type: String,
}

/// Read and base64-encode a source image.
///
/// # Errors
/// [`FileError::Io`] if the underlying file cannot be read. Never retried.
pub async fn encode_image(image: &SourceImage) -> Result<EncodedImage, FileError> {
    let owned;
    let bytes: &[u8] = match &image.bytes {
        ImageBytes::Memory(b) => b,
        ImageBytes::File(path) => {
            owned = tokio::fs::read(path).await.map_err(|e| FileError::Io {
                name: image.name.clone(),
                detail: e.to_string(),
            })?;
            &owned
        }
    };

    let mime_type = match &image.mime_type {
        Some(m) => m.clone(),
        None => sniff_mime_type(bytes),
    };
    if !mime_type.starts_with("image/") {
        warn!(
            "{}: MIME type '{}' is not an image; the model may reject it",
            image.name, mime_type
        );
    }

    let base64_data = STANDARD.encode(bytes);
    debug!(
        "Encoded {} ({}) → {} bytes base64",
        image.name,
        mime_type,
        base64_data.len()
    );

    Ok(EncodedImage {
        base64_data,
        mime_type,
    })
}

/// Guess a MIME type from magic bytes.
fn sniff_mime_type(bytes: &[u8]) -> String {
    image::guess_format(bytes)
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|_| "application/octet-stream".to_string())
}
