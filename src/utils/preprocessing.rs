//! Shared image preprocessing utilities
//!
//! Both models consume square NCHW tensors. The matting model sees the image
//! letterboxed (aspect ratio preserved, centered on a padded canvas) and the
//! restoration model sees it either letterboxed or stretched depending on the
//! alignment flag. `Letterbox` records the geometry so model outputs can be
//! mapped back onto the original pixels.

use crate::{
    error::{Result, RetouchError},
    models::PreprocessingConfig,
    utils::validation::TensorValidator,
};
use image::{imageops::FilterType, DynamicImage, ImageBuffer, Rgb, RgbImage};
use ndarray::Array4;

/// Configuration for preprocessing behavior
#[derive(Debug, Clone)]
pub struct PreprocessingOptions {
    /// Padding color for aspect ratio preservation (RGB)
    pub padding_color: [u8; 3],
    /// Whether to return the padded canvas alongside the tensor
    pub return_canvas: bool,
}

impl Default for PreprocessingOptions {
    fn default() -> Self {
        Self {
            padding_color: [255, 255, 255],
            return_canvas: false,
        }
    }
}

/// Geometry of an aspect-preserving resize onto a square canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub target_size: u32,
    pub scale: f32,
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl Letterbox {
    /// Compute the letterbox for an image of `original` (width, height)
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(original: (u32, u32), target_size: u32) -> Result<Self> {
        let (orig_width, orig_height) = original;
        if orig_width == 0 || orig_height == 0 || target_size == 0 {
            return Err(RetouchError::processing(format!(
                "Cannot letterbox {}x{} onto {}x{}",
                orig_width, orig_height, target_size, target_size
            )));
        }

        let target = target_size as f32;
        let scale = (target / orig_width as f32).min(target / orig_height as f32);

        let scaled_width = ((orig_width as f32 * scale).round() as u32).clamp(1, target_size);
        let scaled_height = ((orig_height as f32 * scale).round() as u32).clamp(1, target_size);

        Ok(Self {
            target_size,
            scale,
            scaled_width,
            scaled_height,
            offset_x: (target_size - scaled_width) / 2,
            offset_y: (target_size - scaled_height) / 2,
        })
    }

    /// Map an original pixel coordinate to its canvas coordinate
    ///
    /// Pixel centers are mapped and the result always lands inside
    /// [`Letterbox::content_region`], whatever the scale.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn to_canvas(&self, x: u32, y: u32) -> (u32, u32) {
        let scaled_x = (((x as f32 + 0.5) * self.scale) as u32).min(self.scaled_width - 1);
        let scaled_y = (((y as f32 + 0.5) * self.scale) as u32).min(self.scaled_height - 1);
        (scaled_x + self.offset_x, scaled_y + self.offset_y)
    }

    /// Canvas region holding the image content, as (x, y, width, height)
    #[must_use]
    pub fn content_region(&self) -> (u32, u32, u32, u32) {
        (
            self.offset_x,
            self.offset_y,
            self.scaled_width,
            self.scaled_height,
        )
    }
}

/// Result of letterbox preprocessing
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    pub tensor: Array4<f32>,
    pub letterbox: Letterbox,
    /// The padded canvas, when requested through `PreprocessingOptions`
    pub canvas: Option<RgbImage>,
}

/// Shared image preprocessing utilities
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Letterbox an image onto the model canvas and normalize it into NCHW
    ///
    /// # Errors
    /// - Image dimensions are zero or out of range
    /// - Invalid preprocessing configuration
    pub fn preprocess_image(
        image: &DynamicImage,
        preprocessing_config: &PreprocessingConfig,
        options: &PreprocessingOptions,
    ) -> Result<PreprocessedImage> {
        preprocessing_config.validate()?;
        let target_size = preprocessing_config.target_size[0];

        let rgb_image = image.to_rgb8();
        let (orig_width, orig_height) = rgb_image.dimensions();
        TensorValidator::validate_image_dimensions(orig_width, orig_height)?;

        let letterbox = Letterbox::new((orig_width, orig_height), target_size)?;
        let resized = image::imageops::resize(
            &rgb_image,
            letterbox.scaled_width,
            letterbox.scaled_height,
            FilterType::Triangle,
        );

        let [r, g, b] = options.padding_color;
        let mut canvas = ImageBuffer::from_pixel(target_size, target_size, Rgb([r, g, b]));
        image::imageops::replace(
            &mut canvas,
            &resized,
            i64::from(letterbox.offset_x),
            i64::from(letterbox.offset_y),
        );

        let tensor = Self::canvas_to_tensor(&canvas, preprocessing_config);

        Ok(PreprocessedImage {
            tensor,
            letterbox,
            canvas: options.return_canvas.then_some(canvas),
        })
    }

    /// Letterbox with the default white padding, returning the tensor and its geometry
    ///
    /// # Errors
    /// Same as [`ImagePreprocessor::preprocess_image`]
    pub fn preprocess_for_inference(
        image: &DynamicImage,
        preprocessing_config: &PreprocessingConfig,
    ) -> Result<(Array4<f32>, Letterbox)> {
        let preprocessed =
            Self::preprocess_image(image, preprocessing_config, &PreprocessingOptions::default())?;
        Ok((preprocessed.tensor, preprocessed.letterbox))
    }

    /// Stretch an image to the model canvas without preserving aspect ratio
    ///
    /// # Errors
    /// - Image dimensions are zero or out of range
    /// - Invalid preprocessing configuration
    pub fn preprocess_stretched(
        image: &DynamicImage,
        preprocessing_config: &PreprocessingConfig,
    ) -> Result<Array4<f32>> {
        preprocessing_config.validate()?;
        let target_size = preprocessing_config.target_size[0];
        let rgb_image = image.to_rgb8();
        TensorValidator::validate_image_dimensions(rgb_image.width(), rgb_image.height())?;

        let resized =
            image::imageops::resize(&rgb_image, target_size, target_size, FilterType::Triangle);
        Ok(Self::canvas_to_tensor(&resized, preprocessing_config))
    }

    /// Convert an RGB canvas to a normalized (1, 3, H, W) tensor
    #[must_use]
    pub fn canvas_to_tensor(
        canvas: &RgbImage,
        preprocessing_config: &PreprocessingConfig,
    ) -> Array4<f32> {
        let (width, height) = canvas.dimensions();
        let mean = preprocessing_config.normalization_mean;
        let std = preprocessing_config.normalization_std;

        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
        #[allow(clippy::indexing_slicing)]
        // Safe: tensor dimensions pre-allocated to match canvas size
        for (x, y, pixel) in canvas.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                tensor[[0, c, y, x]] = (f32::from(pixel[c]) / 255.0 - mean[c]) / std[c];
            }
        }
        tensor
    }

    /// Invert `canvas_to_tensor`: denormalize a (1, 3, H, W) tensor into RGB pixels
    ///
    /// # Errors
    /// - Tensor is not a single RGB image
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn tensor_to_rgb(
        tensor: &Array4<f32>,
        preprocessing_config: &PreprocessingConfig,
    ) -> Result<RgbImage> {
        TensorValidator::validate_single_batch_rgb(tensor)?;
        let (_, _, height, width) = tensor.dim();
        let mean = preprocessing_config.normalization_mean;
        let std = preprocessing_config.normalization_std;

        let image = ImageBuffer::from_fn(width as u32, height as u32, |x, y| {
            let (x, y) = (x as usize, y as usize);
            let mut pixel = [0u8; 3];
            for (c, channel) in pixel.iter_mut().enumerate() {
                let value = tensor
                    .get([0, c, y, x])
                    .map_or(0.0, |v| v * std[c] + mean[c]);
                *channel = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
            }
            Rgb(pixel)
        });
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(size: u32) -> PreprocessingConfig {
        let mut config = PreprocessingConfig::isnet();
        config.target_size = [size, size];
        config
    }

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([255, 0, 0])))
    }

    #[test]
    fn test_letterbox_geometry() {
        let letterbox = Letterbox::new((200, 100), 100).unwrap();
        assert!((letterbox.scale - 0.5).abs() < f32::EPSILON);
        assert_eq!((letterbox.scaled_width, letterbox.scaled_height), (100, 50));
        assert_eq!((letterbox.offset_x, letterbox.offset_y), (0, 25));
        assert_eq!(letterbox.to_canvas(0, 0), (0, 25));
        assert_eq!(letterbox.to_canvas(198, 98), (99, 74));
        assert_eq!(letterbox.content_region(), (0, 25, 100, 50));
    }

    #[test]
    fn test_to_canvas_stays_inside_content_when_downscaling() {
        // Scale 0.32: rounding the last column would land on the canvas edge
        let letterbox = Letterbox::new((100, 10), 32).unwrap();
        let (x, y, w, h) = letterbox.content_region();
        for oy in 0..10 {
            for ox in 0..100 {
                let (cx, cy) = letterbox.to_canvas(ox, oy);
                assert!((x..x + w).contains(&cx), "column {ox} mapped to {cx}");
                assert!((y..y + h).contains(&cy), "row {oy} mapped to {cy}");
            }
        }

        let large = Letterbox::new((4000, 3000), 1024).unwrap();
        let (cx, cy) = large.to_canvas(3999, 2999);
        assert!(cx < 1024);
        assert!(cy < large.offset_y + large.scaled_height);
    }

    #[test]
    fn test_letterbox_extreme_aspect_keeps_one_row() {
        let letterbox = Letterbox::new((10_000, 1), 64).unwrap();
        assert_eq!(letterbox.scaled_height, 1);
        assert_eq!(letterbox.scaled_width, 64);
        assert!(Letterbox::new((0, 10), 64).is_err());
    }

    #[test]
    fn test_preprocess_for_inference_shape_and_padding() {
        let image = create_test_image(64, 32);
        let config = small_config(32);

        let (tensor, letterbox) = ImagePreprocessor::preprocess_for_inference(&image, &config).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 32, 32]);
        assert_eq!(letterbox.offset_y, 8);

        // White padding row: (1.0 - 0.5) / 1.0
        assert!((tensor[[0, 1, 0, 0]] - 0.5).abs() < 1e-6);
        // Red content in the middle: green channel is (0.0 - 0.5) / 1.0
        assert!((tensor[[0, 0, 16, 16]] - 0.5).abs() < 1e-6);
        assert!((tensor[[0, 1, 16, 16]] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_returns_canvas_on_request() {
        let image = create_test_image(10, 20);
        let options = PreprocessingOptions {
            padding_color: [0, 0, 0],
            return_canvas: true,
        };
        let result = ImagePreprocessor::preprocess_image(&image, &small_config(20), &options).unwrap();
        let canvas = result.canvas.unwrap();
        assert_eq!(canvas.dimensions(), (20, 20));
        assert_eq!(canvas.get_pixel(0, 10), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(10, 10), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_stretched_fills_canvas() {
        let image = create_test_image(40, 10);
        let tensor = ImagePreprocessor::preprocess_stretched(&image, &small_config(16)).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 16, 16]);
        // No padding anywhere: every red channel value is (1.0 - 0.5) / 1.0
        assert!(tensor
            .index_axis(ndarray::Axis(1), 0)
            .iter()
            .all(|v| (*v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_tensor_to_rgb_inverts_normalization() {
        let config = PreprocessingConfig {
            target_size: [2, 2],
            normalization_mean: [0.5, 0.5, 0.5],
            normalization_std: [0.5, 0.5, 0.5],
        };
        let canvas = ImageBuffer::from_fn(2, 2, |x, y| Rgb([(x * 100) as u8, (y * 200) as u8, 17]));
        let tensor = ImagePreprocessor::canvas_to_tensor(&canvas, &config);
        let restored = ImagePreprocessor::tensor_to_rgb(&tensor, &config).unwrap();
        assert_eq!(restored, canvas);

        let mask = Array4::<f32>::zeros((1, 1, 2, 2));
        assert!(ImagePreprocessor::tensor_to_rgb(&mask, &config).is_err());
    }

    #[test]
    fn test_tensor_to_rgb_clamps_out_of_range_values() {
        let config = PreprocessingConfig::gfpgan();
        let tensor = Array4::<f32>::from_elem((1, 3, 1, 1), 3.0);
        let image = ImagePreprocessor::tensor_to_rgb(&tensor, &config).unwrap();
        assert_eq!(image.get_pixel(0, 0), &Rgb([255, 255, 255]));
    }
}
