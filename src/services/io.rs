//! Image I/O operations service
//!
//! Decoding of request payloads and uploaded files, and persistence of
//! uploads and results on disk.

use crate::{
    error::{Result, RetouchError},
    utils::TensorValidator,
};
use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use image::{DynamicImage, GenericImageView};
use std::path::Path;

/// Standard alphabet, padding optional
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Service for handling image input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Decode a base64 image payload into raw bytes
    ///
    /// Everything up to and including the first comma is treated as a data-URI
    /// prefix and dropped. ASCII whitespace is ignored.
    ///
    /// # Errors
    /// - `InvalidFormat` when the text is not valid base64
    pub fn decode_base64_payload(payload: &str) -> Result<Vec<u8>> {
        let encoded = payload.split_once(',').map_or(payload, |(_, data)| data);
        let compact: String = encoded
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();

        LENIENT_BASE64
            .decode(compact.as_bytes())
            .map_err(|e| RetouchError::invalid_format(format!("Invalid base64 image data: {e}")))
    }

    /// Decode a base64 payload straight into an image
    ///
    /// # Errors
    /// - `InvalidFormat` for bad base64 or undecodable image bytes
    pub fn load_from_base64(payload: &str) -> Result<DynamicImage> {
        let bytes = Self::decode_base64_payload(payload)?;
        Self::load_from_bytes(&bytes)
    }

    /// Load an image from bytes, sniffing the format from content
    ///
    /// # Errors
    /// - `InvalidFormat` when the bytes are not a supported raster image
    pub fn load_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        let image = image::load_from_memory(bytes).map_err(|e| {
            RetouchError::invalid_format(format!("Failed to decode image: {e}"))
        })?;
        let (width, height) = image.dimensions();
        TensorValidator::validate_image_dimensions(width, height)?;
        Ok(image)
    }

    /// Load an image from a file path
    ///
    /// Tries extension-based decoding first, then falls back to content sniffing.
    ///
    /// # Errors
    /// - I/O errors when the file cannot be read
    /// - `InvalidFormat` when neither decoding strategy succeeds
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        match image::open(path_ref) {
            Ok(image) => {
                let (width, height) = image.dimensions();
                TensorValidator::validate_image_dimensions(width, height)?;
                Ok(image)
            },
            Err(e) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                );
                let data = std::fs::read(path_ref)
                    .map_err(|io_err| RetouchError::file_io_error("read image data", path_ref, &io_err))?;
                Self::load_from_bytes(&data).map_err(|content_err| {
                    RetouchError::invalid_format(format!(
                        "Failed to load image '{}' ({} bytes). Extension error: {}. Content error: {}",
                        path_ref.display(),
                        data.len(),
                        e,
                        content_err
                    ))
                })
            },
        }
    }

    /// Write raw bytes to a file, creating the parent directory if needed
    ///
    /// # Errors
    /// - Directory creation or write failures
    pub fn save_bytes<P: AsRef<Path>>(bytes: &[u8], path: P) -> Result<()> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RetouchError::file_io_error("create upload directory", parent, &e))?;
        }
        std::fs::write(path_ref, bytes)
            .map_err(|e| RetouchError::file_io_error("write upload", path_ref, &e))
    }
}
