//! Core types shared by the processing pipelines

use crate::{
    error::{Result, RetouchError},
    utils::TensorValidator,
};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Per-pixel alpha mask with the dimensions of the image it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationMask {
    /// Mask data as alpha values (0-255), row-major
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    /// Create a new segmentation mask
    ///
    /// # Errors
    /// - Data length does not match the dimensions
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Result<Self> {
        TensorValidator::validate_mask_dimensions(data.len(), dimensions.0, dimensions.1)?;
        Ok(Self { data, dimensions })
    }

    /// Apply the mask as the alpha channel of an RGBA image
    ///
    /// Fully transparent pixels are cleared to transparent black.
    pub fn apply_to_image(&self, image: &mut RgbaImage) -> Result<()> {
        if image.dimensions() != self.dimensions {
            return Err(RetouchError::processing(format!(
                "Image and mask dimensions do not match: {:?} vs {:?}",
                image.dimensions(),
                self.dimensions
            )));
        }

        for (pixel, &alpha) in image.pixels_mut().zip(&self.data) {
            if alpha == 0 {
                *pixel = image::Rgba([0, 0, 0, 0]);
            } else {
                pixel[3] = alpha;
            }
        }
        Ok(())
    }

    /// Get mask statistics
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn statistics(&self) -> MaskStatistics {
        let total_pixels = self.data.len();
        let foreground_pixels = self.data.iter().filter(|&&x| x > 127).count();
        let background_pixels = total_pixels - foreground_pixels;
        let ratio = |n: usize| {
            if total_pixels == 0 {
                0.0
            } else {
                n as f32 / total_pixels as f32
            }
        };

        MaskStatistics {
            total_pixels,
            foreground_pixels,
            background_pixels,
            foreground_ratio: ratio(foreground_pixels),
            background_ratio: ratio(background_pixels),
        }
    }
}

/// Statistics about a segmentation mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskStatistics {
    pub total_pixels: usize,
    pub foreground_pixels: usize,
    pub background_pixels: usize,
    pub foreground_ratio: f32,
    pub background_ratio: f32,
}

/// Timing breakdown of one model-backed request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Image preprocessing (resize, normalize, tensor conversion)
    pub preprocessing_ms: u64,

    /// Model inference execution
    pub inference_ms: u64,

    /// Mapping the prediction back onto the original image plus applying it
    /// as alpha
    pub postprocessing_ms: u64,

    /// Total end-to-end processing time
    pub total_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_rejects_length_mismatch() {
        assert!(SegmentationMask::new(vec![0; 5], (2, 2)).is_err());
        assert!(SegmentationMask::new(vec![0; 4], (2, 2)).is_ok());
    }

    #[test]
    fn test_apply_to_image_sets_alpha_and_clears_background() {
        let mask = SegmentationMask::new(vec![0, 128, 255, 0], (2, 2)).unwrap();
        let mut image = RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]));
        mask.apply_to_image(&mut image).unwrap();

        assert_eq!(image.get_pixel(0, 0), &image::Rgba([0, 0, 0, 0]));
        assert_eq!(image.get_pixel(1, 0), &image::Rgba([10, 20, 30, 128]));
        assert_eq!(image.get_pixel(0, 1), &image::Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_apply_to_image_dimension_mismatch() {
        let mask = SegmentationMask::new(vec![255; 4], (2, 2)).unwrap();
        let mut image = RgbaImage::new(3, 2);
        assert!(mask.apply_to_image(&mut image).is_err());
    }

    #[test]
    fn test_statistics() {
        let mask = SegmentationMask::new(vec![0, 0, 200, 255], (2, 2)).unwrap();
        let stats = mask.statistics();
        assert_eq!(stats.foreground_pixels, 2);
        assert_eq!(stats.background_pixels, 2);
        assert!((stats.foreground_ratio - 0.5).abs() < f32::EPSILON);
    }
}
