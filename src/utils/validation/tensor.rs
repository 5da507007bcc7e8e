//! Tensor and image dimension validation

use crate::error::{Result, RetouchError};
use ndarray::Array4;

/// Largest accepted edge of a decoded input image
pub const MAX_DIMENSION: u32 = 16384;

/// Validator for tensor operations and shape validation
pub struct TensorValidator;

impl TensorValidator {
    /// Validate that a matting output has batch size 1 and a single channel
    pub fn validate_single_batch_single_channel(tensor: &Array4<f32>) -> Result<()> {
        let (batch, channels, _, _) = tensor.dim();
        if batch != 1 || channels != 1 {
            return Err(RetouchError::processing(format!(
                "Mask tensor must have batch size 1 and a single channel, got {:?}",
                tensor.dim()
            )));
        }
        Ok(())
    }

    /// Validate that a restoration output is a single RGB image
    pub fn validate_single_batch_rgb(tensor: &Array4<f32>) -> Result<()> {
        let (batch, channels, _, _) = tensor.dim();
        if batch != 1 || channels != 3 {
            return Err(RetouchError::processing(format!(
                "Image tensor must have batch size 1 and three channels, got {:?}",
                tensor.dim()
            )));
        }
        Ok(())
    }

    /// Validate decoded image dimensions are within reasonable bounds
    pub fn validate_image_dimensions(width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(RetouchError::invalid_format(format!(
                "Image dimensions too small: {}x{}",
                width, height
            )));
        }

        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(RetouchError::invalid_format(format!(
                "Image dimensions too large: {}x{}. Maximum: {}x{}",
                width, height, MAX_DIMENSION, MAX_DIMENSION
            )));
        }

        Ok(())
    }

    /// Validate mask data length matches image dimensions
    pub fn validate_mask_dimensions(mask_data_len: usize, width: u32, height: u32) -> Result<()> {
        let expected_len = width as usize * height as usize;
        if mask_data_len != expected_len {
            return Err(RetouchError::processing(format!(
                "Mask data length {} doesn't match image dimensions {}x{} (expected {} pixels)",
                mask_data_len, width, height, expected_len
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    #[test]
    fn test_validate_single_batch_single_channel() {
        let valid_tensor = Array::zeros((1, 1, 256, 256));
        assert!(TensorValidator::validate_single_batch_single_channel(&valid_tensor).is_ok());

        let invalid_batch = Array::zeros((2, 1, 256, 256));
        assert!(TensorValidator::validate_single_batch_single_channel(&invalid_batch).is_err());

        let invalid_channels = Array::zeros((1, 3, 256, 256));
        assert!(TensorValidator::validate_single_batch_single_channel(&invalid_channels).is_err());
        assert!(TensorValidator::validate_single_batch_rgb(&invalid_channels).is_ok());
    }

    #[test]
    fn test_validate_image_dimensions() {
        assert!(TensorValidator::validate_image_dimensions(1, 1).is_ok());
        assert!(TensorValidator::validate_image_dimensions(4032, 3024).is_ok());

        let err = TensorValidator::validate_image_dimensions(0, 10).unwrap_err();
        assert!(err.is_client_error());
        assert!(TensorValidator::validate_image_dimensions(MAX_DIMENSION + 1, 10).is_err());
    }

    #[test]
    fn test_validate_mask_dimensions() {
        assert!(TensorValidator::validate_mask_dimensions(12, 4, 3).is_ok());
        assert!(TensorValidator::validate_mask_dimensions(11, 4, 3).is_err());
    }
}
