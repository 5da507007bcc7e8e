//! Luminance threshold background removal
//!
//! A model-free fallback for images shot against a near-white backdrop. Each
//! pixel's BT.601 luma is computed with the fixed-point weights OpenCV uses
//! for `COLOR_BGR2GRAY`; bright pixels become transparent and everything else
//! stays opaque. Colour channels are left untouched.

use crate::types::SegmentationMask;
use image::{DynamicImage, RgbImage, RgbaImage};

/// Pixels brighter than this are treated as background
pub const LUMA_THRESHOLD: u8 = 240;

const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;
const SHIFT: u32 = 14;

/// BT.601 luma with 14-bit fixed-point rounding
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn bt601_luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted =
        u32::from(r) * R_WEIGHT + u32::from(g) * G_WEIGHT + u32::from(b) * B_WEIGHT;
    ((weighted + (1 << (SHIFT - 1))) >> SHIFT) as u8
}

/// Binary mask: 0 where luma exceeds `threshold`, 255 elsewhere
#[must_use]
pub fn threshold_mask(image: &RgbImage, threshold: u8) -> SegmentationMask {
    let data = image
        .pixels()
        .map(|p| {
            if bt601_luma(p[0], p[1], p[2]) > threshold {
                0
            } else {
                255
            }
        })
        .collect();
    SegmentationMask {
        data,
        dimensions: image.dimensions(),
    }
}

/// Make near-white pixels transparent
///
/// Any alpha in the input is discarded before the threshold is applied.
#[must_use]
pub fn remove_background(image: &DynamicImage) -> RgbaImage {
    let mask = threshold_mask(&image.to_rgb8(), LUMA_THRESHOLD);
    let mut rgba = image.to_rgba8();
    for (pixel, &alpha) in rgba.pixels_mut().zip(&mask.data) {
        pixel[3] = alpha;
    }
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba};

    #[test]
    fn test_luma_matches_reference_values() {
        assert_eq!(bt601_luma(255, 255, 255), 255);
        assert_eq!(bt601_luma(0, 0, 0), 0);
        assert_eq!(bt601_luma(255, 0, 0), 76);
        assert_eq!(bt601_luma(0, 255, 0), 150);
        assert_eq!(bt601_luma(0, 0, 255), 29);
    }

    #[test]
    fn test_white_becomes_transparent() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(6, 4, Rgb([255, 255, 255])));
        let result = remove_background(&image);
        assert_eq!(result.dimensions(), (6, 4));
        assert!(result.pixels().all(|p| p.0 == [255, 255, 255, 0]));
    }

    #[test]
    fn test_black_stays_opaque() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([0, 0, 0])));
        let result = remove_background(&image);
        assert!(result.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn test_threshold_boundary() {
        // Exactly 240 is kept, 241 is removed
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(0, 0, Rgb([240, 240, 240]));
        image.put_pixel(1, 0, Rgb([241, 241, 241]));
        let mask = threshold_mask(&image, LUMA_THRESHOLD);
        assert_eq!(mask.data, vec![255, 0]);
    }

    #[test]
    fn test_input_alpha_is_ignored() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 10, 10, 0])));
        let result = remove_background(&image);
        assert!(result.pixels().all(|p| p.0 == [10, 10, 10, 255]));
    }
}
