//! Uploaded image handling.
//!
//! The raw upload is decoded and written back out in its own format so the
//! bytes handed to the service are always a freshly encoded stream.

use crate::error::UploadError;
use base64::{engine::general_purpose, Engine as _};
use image::{ImageFormat, ImageOutputFormat};
use std::io::Cursor;

const JPEG_QUALITY: u8 = 90;

/// Formats the uploader accepts.
pub const ACCEPTED_FORMATS: [ImageFormat; 1] = [ImageFormat::Jpeg];

#[derive(Debug, Clone, PartialEq)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl UploadedImage {
    /// Sniff, decode, and re-encode an upload.
    pub fn from_upload(raw: &[u8]) -> Result<Self, UploadError> {
        if raw.is_empty() {
            return Err(UploadError::Empty);
        }

        let format = image::guess_format(raw)
            .map_err(|_| UploadError::Unsupported("unknown".to_string()))?;
        if !ACCEPTED_FORMATS.contains(&format) {
            return Err(UploadError::Unsupported(format_name(format).to_string()));
        }

        let img = image::load_from_memory_with_format(raw, format)
            .map_err(|e| UploadError::Decode(e.to_string()))?;

        let mut bytes = Vec::with_capacity(raw.len());
        img.write_to(&mut Cursor::new(&mut bytes), output_format(format))
            .map_err(|e| UploadError::Encode(e.to_string()))?;

        tracing::debug!(
            original = raw.len(),
            encoded = bytes.len(),
            width = img.width(),
            height = img.height(),
            "Re-encoded upload"
        );

        Ok(Self {
            bytes,
            format,
            width: img.width(),
            height: img.height(),
        })
    }

    pub fn content_type(&self) -> &'static str {
        match self.format {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Gif => "image/gif",
            _ => "application/octet-stream",
        }
    }

    /// Data URL for previewing the image inline.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type(),
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

fn output_format(format: ImageFormat) -> ImageOutputFormat {
    match format {
        ImageFormat::Jpeg => ImageOutputFormat::Jpeg(JPEG_QUALITY),
        other => ImageOutputFormat::from(other),
    }
}

fn format_name(format: ImageFormat) -> &'static str {
    format.extensions_str().first().copied().unwrap_or("unknown")
}
