//! Output format handling service
//!
//! Encoding of processed images into response and file bytes.

use crate::{
    config::OutputFormat,
    error::{Result, RetouchError},
};
use base64::{engine::general_purpose, Engine as _};
use image::{codecs::jpeg::JpegEncoder, DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Service for handling output format conversions
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Convert an RGBA image to the pixel layout of the output format
    ///
    /// JPEG has no alpha channel, so it is dropped.
    #[must_use]
    pub fn convert_format(rgba_image: RgbaImage, format: OutputFormat) -> DynamicImage {
        match format {
            OutputFormat::Png => DynamicImage::ImageRgba8(rgba_image),
            OutputFormat::Jpeg => {
                DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(rgba_image).to_rgb8())
            },
        }
    }

    /// Encode an image into bytes
    ///
    /// `quality` only applies to JPEG.
    ///
    /// # Errors
    /// - Encoder failures
    pub fn encode(image: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        match format {
            OutputFormat::Png => image.write_to(&mut buffer, ImageFormat::Png),
            OutputFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
                DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)
            },
        }
        .map_err(|e| {
            RetouchError::processing_stage_error(
                "encode",
                &e.to_string(),
                Some(&format!(
                    "{:?} {}x{}",
                    format,
                    image.width(),
                    image.height()
                )),
            )
        })?;
        Ok(buffer.into_inner())
    }

    /// Encode an RGBA image as PNG and base64 it (standard alphabet, padded)
    ///
    /// # Errors
    /// - PNG encoder failures
    pub fn to_base64_png(rgba_image: RgbaImage) -> Result<String> {
        let image = Self::convert_format(rgba_image, OutputFormat::Png);
        let bytes = Self::encode(&image, OutputFormat::Png, 100)?;
        Ok(general_purpose::STANDARD.encode(bytes))
    }

    /// File extension for a format (without the dot)
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    /// MIME type for a format
    #[must_use]
    pub fn content_type(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }
}
