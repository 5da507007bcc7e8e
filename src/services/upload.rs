//! Upload naming policy
//!
//! Client filenames are untrusted: only the final path component is kept, the
//! extension must be on the allow-list, and every stored upload gets a fresh
//! UUID so identical client names never collide.

use crate::{
    config::OutputFormat,
    error::{Result, RetouchError},
    services::OutputFormatHandler,
};
use std::path::Path;
use uuid::Uuid;

/// Extensions accepted by `/restore` (compared case-insensitively)
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Names of the files written for one restoration request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadNames {
    /// Stored upload, `input_<uuid>_<basename>`
    pub upload: String,
    /// Restored output, `restored_<upload stem>.jpg`
    pub restored: String,
}

/// Final path component of a client filename, with either separator style
#[must_use]
pub fn basename(client_name: &str) -> &str {
    client_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(client_name)
        .trim()
}

/// Whether the filename carries an allowed image extension
///
/// Only the suffix after the last dot counts, so a bare `.png` is accepted.
#[must_use]
pub fn has_allowed_extension(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    ALLOWED_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{ext}")))
}

/// Validate a client filename and derive the stored names
///
/// # Errors
/// - `MissingInput` when the filename is empty
/// - `InvalidFormat` when the extension is not allowed
pub fn upload_names(client_name: &str, request_id: Uuid) -> Result<UploadNames> {
    if client_name.trim().is_empty() {
        return Err(RetouchError::missing_input("No file selected"));
    }

    let base = basename(client_name);
    if !has_allowed_extension(base) {
        return Err(RetouchError::invalid_format(
            "Invalid file format. Only PNG, JPG, and JPEG are supported.",
        ));
    }

    let upload = format!("input_{}_{}", request_id, base);
    let stem = Path::new(&upload)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(upload.as_str());
    let restored = format!(
        "restored_{}.{}",
        stem,
        OutputFormatHandler::get_extension(OutputFormat::Jpeg)
    );

    Ok(UploadNames { upload, restored })
}
