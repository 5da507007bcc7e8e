//! Inference backend implementations
//!
//! The ONNX Runtime backend runs the matting and face restoration models; the
//! mock backend produces deterministic tensors so the HTTP layer can be
//! exercised without model files.

pub mod mock;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use mock::MockBackend;
#[cfg(feature = "onnx")]
pub use onnx::OnnxBackend;
