//! Services shared by the HTTP handlers
//!
//! Payload decoding, file persistence, output encoding and the upload naming
//! policy live here so handlers stay thin.

pub mod format;
pub mod io;
pub mod upload;

pub use format::OutputFormatHandler;
pub use io::ImageIOService;
pub use upload::{upload_names, UploadNames};
